use std::path::Path;

use common::{
    error::AppError,
    storage::{
        vector_index::FlatL2Index,
        vector_store::PersistedKnowledge,
    },
    utils::{
        config::{AppConfig, KnowledgeSource},
        embedding::EmbeddingProvider,
    },
};
use tracing::info;

/// FAQ chunks served when `knowledge_source` is `builtin`.
pub const BUILTIN_CHUNKS: &[&str] = &[
    "Iqra University (IU) was chartered by the Government of Sindh in 1998. It has campuses in Karachi (Main, North, EDC, Airport), Islamabad, and Quetta.",
    "The Main Campus is located at Gulshan-e-Iqbal, Block 9, Karachi. For queries, call 021-111-264-264 or email info@iqra.edu.pk.",
    "Admissions at Iqra University are open twice a year: Fall Semester (starts September) and Spring Semester (starts February).",
    "The BS Computer Science (BSCS) is a 4-year degree requiring 130 credit hours and a minimum CGPA of 2.0 for graduation.",
    "Fee Structure: For most BS programs, the fee per semester ranges between 80,000 to 120,000 PKR. Exact fees depend on the number of courses.",
    "Attendance Policy: Students must maintain a minimum of 80% attendance in each course to be eligible for final examinations.",
    "Scholarships: IU offers Merit-based scholarships for high achievers, Need-based for financial support, and specialized Sports scholarships.",
    "Library Timings: The library is open Monday to Friday from 8:00 AM to 8:00 PM, and on weekends from 9:00 AM to 5:00 PM.",
    "Hostel: Separate hostel facilities are available for out-station female students at the Karachi campus with secure environments.",
    "Career Services: The Career Services Office (CSO) helps students with internship placements, CV writing, and job interviews with top firms.",
    "LMS Access: Students can access their portal, grades, and course material at https://lms.iqra.edu.pk using their student ID.",
    "Convocation: Graduation ceremonies are typically held in December each year to celebrate student achievements.",
];

/// Ordered chunk texts and the index over their embeddings. Read-only after construction.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    chunks: Vec<String>,
    index: FlatL2Index,
}

impl KnowledgeBase {
    pub async fn from_config(
        config: &AppConfig,
        provider: &EmbeddingProvider,
    ) -> Result<Self, AppError> {
        let knowledge = match config.knowledge_source {
            KnowledgeSource::Builtin => {
                let chunks = BUILTIN_CHUNKS.iter().map(ToString::to_string).collect();
                Self::from_chunks(chunks, provider).await?
            }
            KnowledgeSource::VectorStore => {
                Self::load_persisted(Path::new(&config.vector_store_dir), provider).await?
            }
        };

        info!(
            source = ?config.knowledge_source,
            chunks = knowledge.len(),
            dimension = knowledge.dimension(),
            "knowledge base ready"
        );
        Ok(knowledge)
    }

    /// Embeds `chunks` in one batch and indexes them in order.
    pub async fn from_chunks(
        chunks: Vec<String>,
        provider: &EmbeddingProvider,
    ) -> Result<Self, AppError> {
        let embeddings = provider.embed_batch(chunks.clone()).await?;
        if embeddings.len() != chunks.len() {
            return Err(AppError::InternalError(format!(
                "embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut index = FlatL2Index::new(provider.dimension());
        index.add(embeddings)?;
        Ok(Self { chunks, index })
    }

    /// Loads the artifacts written by ingestion. The stored index must have been built
    /// with an embedding model of the same dimension as `provider`.
    pub async fn load_persisted(
        dir: &Path,
        provider: &EmbeddingProvider,
    ) -> Result<Self, AppError> {
        let PersistedKnowledge { index, chunks } = PersistedKnowledge::load(dir).await?;
        if index.dimension() != provider.dimension() {
            return Err(AppError::Validation(format!(
                "vector store at {} has dimension {} but the {} embedding provider produces {}",
                dir.display(),
                index.dimension(),
                provider.backend_label(),
                provider.dimension()
            )));
        }
        Ok(Self { chunks, index })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Chunk texts of the `top_k` nearest neighbours of `query_embedding`, nearest first.
    pub fn nearest_chunks(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<String>, AppError> {
        Ok(self
            .index
            .search(query_embedding, top_k)?
            .into_iter()
            .filter_map(|hit| self.chunks.get(hit.position).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn builtin(provider: &EmbeddingProvider) -> KnowledgeBase {
        KnowledgeBase::from_config(&AppConfig::default(), provider)
            .await
            .expect("builtin knowledge base")
    }

    #[tokio::test]
    async fn builtin_source_indexes_every_chunk() {
        let provider = EmbeddingProvider::new_hashed(384).expect("provider");
        let knowledge = builtin(&provider).await;
        assert_eq!(knowledge.len(), BUILTIN_CHUNKS.len());
        assert_eq!(knowledge.dimension(), 384);
        assert_eq!(knowledge.chunks()[7], BUILTIN_CHUNKS[7]);
    }

    #[tokio::test]
    async fn nearest_chunks_finds_library_timings() {
        let provider = EmbeddingProvider::new_hashed(384).expect("provider");
        let knowledge = builtin(&provider).await;
        let query = provider
            .embed("What are the library timings?")
            .await
            .expect("embed");

        let chunks = knowledge.nearest_chunks(&query, 3).expect("search");
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].starts_with("Library Timings"));
    }

    #[tokio::test]
    async fn retrieval_is_capped_by_chunk_count() {
        let provider = EmbeddingProvider::new_hashed(16).expect("provider");
        let knowledge =
            KnowledgeBase::from_chunks(vec!["only one".into(), "and two".into()], &provider)
                .await
                .expect("knowledge base");
        let query = provider.embed("anything").await.expect("embed");
        assert_eq!(knowledge.nearest_chunks(&query, 3).expect("search").len(), 2);
    }

    #[tokio::test]
    async fn persisted_store_must_match_provider_dimension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = EmbeddingProvider::new_hashed(8).expect("provider");
        let built = KnowledgeBase::from_chunks(vec!["hostel".into(), "fees".into()], &writer)
            .await
            .expect("knowledge base");
        PersistedKnowledge::new(built.index.clone(), built.chunks.clone())
            .expect("persisted")
            .save(dir.path())
            .await
            .expect("save");

        let loaded = KnowledgeBase::load_persisted(dir.path(), &writer)
            .await
            .expect("load");
        assert_eq!(loaded.chunks(), built.chunks());

        let other = EmbeddingProvider::new_hashed(16).expect("provider");
        assert!(matches!(
            KnowledgeBase::load_persisted(dir.path(), &other).await,
            Err(AppError::Validation(_))
        ));
    }
}
