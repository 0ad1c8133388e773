//! Tier selection for generation calls.
//!
//! Routing is the cost-control policy of the service: cheap model by
//! default, expensive model only when the query or its context demands it.
//! The rules below are evaluated in priority order and the first match wins;
//! the keyword list and thresholds are contract, not tuning knobs.

/// The closed set of generation tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Economy,
    Premium,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Economy => "economy",
            Tier::Premium => "premium",
        }
    }
}

/// Queries containing any of these need deep reasoning, whatever their size.
const COMPLEX_KEYWORDS: [&str; 9] = [
    "compara",
    "diferencia",
    "analiza",
    "evalúa",
    "razonamiento",
    "pros y contras",
    "tabla comparativa",
    "explicación detallada",
    "resumen ejecutivo",
];

/// Above this many characters the question itself is long enough to lose
/// the thread on the economy model.
const LONG_QUERY_CHARS: usize = 250;

/// Above this much retrieved context the premium model handles it better.
const LARGE_CONTEXT_CHARS: usize = 3000;

/// Decides which tier serves a query. Deterministic, no I/O, no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelRouter;

impl ModelRouter {
    pub fn route(&self, query: &str, context_chunks: &[String]) -> Tier {
        let query_lower = query.to_lowercase();
        if COMPLEX_KEYWORDS.iter().any(|kw| query_lower.contains(kw)) {
            return Tier::Premium;
        }

        if query.chars().count() > LONG_QUERY_CHARS {
            return Tier::Premium;
        }

        let total_context: usize = context_chunks.iter().map(|c| c.chars().count()).sum();
        if total_context > LARGE_CONTEXT_CHARS {
            return Tier::Premium;
        }

        Tier::Economy
    }
}
