//! Boundary to the retrieval subsystem.
//!
//! The real retriever (embeddings, vector search) lives outside this
//! service; handlers only depend on this trait and receive already-retrieved
//! chunks in relevance order.

pub trait Retriever: Send + Sync {
    fn retrieve(&self, query: &str, top_k: usize) -> Vec<String>;
}

/// Fixed snippets standing in for the retrieval backend.
pub struct StaticRetriever {
    chunks: Vec<String>,
}

impl StaticRetriever {
    pub fn new(chunks: Vec<String>) -> Self {
        Self { chunks }
    }

    /// The DB-SI extinguisher snippets the service answers about by default.
    pub fn with_default_corpus() -> Self {
        Self::new(vec![
            "DB-SI 4: Los extintores se colocan a 1.20m de altura.".to_string(),
            "DB-SI 4: Deben estar señalizados con carteles fotoluminiscentes.".to_string(),
        ])
    }
}

impl Retriever for StaticRetriever {
    fn retrieve(&self, _query: &str, top_k: usize) -> Vec<String> {
        self.chunks.iter().take(top_k).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_caps_the_result() {
        let retriever = StaticRetriever::with_default_corpus();
        assert_eq!(retriever.retrieve("extintores", 1).len(), 1);
        assert_eq!(retriever.retrieve("extintores", 5).len(), 2);
    }
}
