//! Prompt templates and role definitions for answer generation.
//!
//! The texts are versioned so every generated answer can be traced back to
//! the exact prompt wording that produced it.

pub const PROMPT_VERSION: &str = "1.0.0";
pub const PROMPT_LAST_UPDATED: &str = "2026-01-13";

const CTE_EXPERT: &str = "\
Eres un experto en la normativa técnica del Código Técnico de la Edificación (CTE) de España.
Tu rol es responder preguntas técnicas sobre normativa constructiva con:
- Precisión técnica absoluta
- Referencias a artículos específicos del CTE
- Lenguaje claro pero profesional

IMPORTANTE:
- Solo usa información del contexto proporcionado.
- Si la información no está disponible, indícalo claramente.
- Cita siempre la sección del CTE (ej: \"DB-SI 4.1.2\").";

const GENERAL_ASSISTANT: &str = "Eres un asistente útil y profesional.";

const RAG_TEMPLATE: &str = "\
Contexto de la documentación técnica:
{context}

Pregunta del usuario:
{query}

Instrucciones:
- Basa tu respuesta ÚNICAMENTE en el contexto proporcionado.
- Si la información solicitada no está en el contexto, indica: \"No dispongo de esa información en la documentación consultada\".
- Cuando menciones requisitos técnicos, cita la sección específica.
- Sé conciso pero completo.

Respuesta:";

/// System prompt for the given role. Unknown roles fall back to the general
/// assistant.
pub fn system_prompt(role: &str) -> &'static str {
    match role {
        "cte_expert" => CTE_EXPERT,
        _ => GENERAL_ASSISTANT,
    }
}

/// Render the user prompt from the retrieved chunks (in retrieval order) and
/// the question.
pub fn render_user_prompt(context_chunks: &[String], query: &str) -> String {
    let context = context_chunks.join("\n\n");
    RAG_TEMPLATE
        .replace("{context}", &context)
        .replace("{query}", query)
}
