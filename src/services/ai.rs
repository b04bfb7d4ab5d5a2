//! Query interpretation, column generation and the assistant chats.
//!
//! Every operation works without an OpenAI key: a keyword-based fallback answers
//! when the client is missing or a call fails.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::clients::openai::{Message, OpenAiClient};
use crate::models::result::{ResultFilters, SearchHit};

pub const MISSING_VALUE: &str = "N/A";

const INTERPRET_PROMPT: &str = r#"You turn search queries for a business meta-search engine into structured filters.
Reply with a JSON object:
{"search_terms": ["..."], "filters": {"country": null, "language": null, "category": null, "status": null}, "suggested_filters": ["..."], "confidence": 0.8}
Use null for filters the query does not imply.
Categories: Tecnología, Finanzas, Medio Ambiente, Salud, Ciencia, Educación, Startups, Aceleradoras
Countries: ES, USA, UK, DE, FR, JP, CA
Languages: Español, Inglés, Alemán, Francés, Japonés
Status: Activo, Pendiente, Completado"#;

const FILTER_CHAT_PROMPT: &str = r#"You help users build search filters from a natural-language request.
Reply with a JSON object:
{"message": "...", "suggested_filters": [{"type": "country", "value": "ES", "label": "España"}], "explanation": "..."}
Filter types: country (ES, USA, UK, DE, FR, JP, CA), category (Tecnología, Finanzas, Medio Ambiente, Salud, Ciencia, Educación, Startups, Aceleradoras), language (Español, Inglés, Alemán, Francés, Japonés), status (Activo, Pendiente, Completado)."#;

const COLUMN_CHAT_PROMPT: &str = r#"You help users design extra table columns for their search results.
Reply with a JSON object:
{"message": "...", "suggested_columns": [{"name": "...", "description": "...", "type": "text|number|date|url|email"}], "explanation": "..."}"#;

const SUPPORT_PROMPT: &str = r#"You are the support assistant of RADAR, a meta-search platform for businesses.
RADAR searches Google, Bing and NewsAPI with natural-language queries, refines results with filters, adds AI-generated columns, re-runs saved searches on a schedule and exports to Excel or PDF.
Be concise and specific. Reply with a JSON object:
{"message": "...", "suggested_actions": ["..."], "helpful_links": [{"title": "...", "description": "..."}]}"#;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryInterpretation {
    pub search_terms: Vec<String>,
    pub filters: ResultFilters,
    pub suggested_filters: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
struct RawInterpretation {
    #[serde(default)]
    search_terms: Vec<String>,
    #[serde(default)]
    filters: HashMap<String, Value>,
    #[serde(default)]
    suggested_filters: Vec<Value>,
    confidence: Option<f64>,
}

impl From<RawInterpretation> for QueryInterpretation {
    fn from(raw: RawInterpretation) -> Self {
        let pick = |key: &str| raw.filters.get(key).and_then(Value::as_str).map(str::to_string);
        let filters = ResultFilters {
            country: pick("country"),
            language: pick("language"),
            category: pick("category"),
            status: pick("status"),
            source: None,
        }
        .normalized();

        Self {
            search_terms: raw.search_terms,
            filters,
            suggested_filters: raw.suggested_filters.iter().map(value_to_text).collect(),
            confidence: raw.confidence.unwrap_or(0.8).clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterSuggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSuggestions {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub suggested_filters: Vec<FilterSuggestion>,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSuggestion {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_column_type")]
    pub kind: String,
}

fn default_column_type() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSuggestions {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub suggested_columns: Vec<ColumnSuggestion>,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HelpfulLink {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportReply {
    pub message: String,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    #[serde(default)]
    pub helpful_links: Vec<HelpfulLink>,
}

#[derive(Debug, Deserialize)]
struct ColumnValues {
    #[serde(default)]
    values: Vec<Value>,
}

#[derive(Serialize)]
struct RowContext<'a> {
    title: &'a str,
    url: &'a str,
    snippet: &'a str,
}

pub struct AiService {
    client: Option<OpenAiClient>,
    batch_size: usize,
}

impl AiService {
    #[must_use]
    pub fn new(client: Option<OpenAiClient>, batch_size: usize) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
        }
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub async fn interpret_query(&self, query: &str) -> QueryInterpretation {
        let Some(client) = &self.client else {
            return fallback_interpretation(query);
        };

        let messages = [
            Message::system(INTERPRET_PROMPT),
            Message::user(format!("Interpret this search query: '{query}'")),
        ];

        match client.chat_json::<RawInterpretation>(&messages, 0.3).await {
            Ok(raw) => QueryInterpretation::from(raw),
            Err(e) => {
                warn!(error = %e, "Query interpretation failed, using keyword fallback");
                fallback_interpretation(query)
            }
        }
    }

    /// One value per row, in row order. Rows are sent in batches; a batch that
    /// fails falls back to generated placeholders and short answers are padded.
    pub async fn generate_column_values(
        &self,
        name: &str,
        description: &str,
        rows: &[SearchHit],
    ) -> Vec<String> {
        let mut values = Vec::with_capacity(rows.len());

        for (batch_index, batch) in rows.chunks(self.batch_size).enumerate() {
            let offset = batch_index * self.batch_size;
            let generated = match &self.client {
                Some(client) => {
                    match request_column_batch(client, name, description, batch).await {
                        Ok(generated) => fit_to_len(generated, batch.len()),
                        Err(e) => {
                            warn!(
                                column = %name,
                                error = %e,
                                "Column generation failed, using fallback"
                            );
                            fallback_column_values(name, offset, batch.len())
                        }
                    }
                }
                None => fallback_column_values(name, offset, batch.len()),
            };
            values.extend(generated);
        }

        values
    }

    pub async fn suggest_filters(&self, message: &str) -> FilterSuggestions {
        if let Some(client) = &self.client {
            let messages = [
                Message::system(FILTER_CHAT_PROMPT),
                Message::user(format!("Help me create filters for: {message}")),
            ];
            match client.chat_json::<FilterSuggestions>(&messages, 0.7).await {
                Ok(suggestions) => return suggestions,
                Err(e) => warn!(error = %e, "Filter suggestion failed, using keyword fallback"),
            }
        }
        fallback_filter_suggestions(message)
    }

    /// `context` is the query of the search the columns are meant for, when known.
    pub async fn suggest_columns(&self, message: &str, context: Option<&str>) -> ColumnSuggestions {
        if let Some(client) = &self.client {
            let prompt = match context {
                Some(query) => {
                    format!("Search query: '{query}'. Help me create columns for: {message}")
                }
                None => format!("Help me create columns for: {message}"),
            };
            let messages = [Message::system(COLUMN_CHAT_PROMPT), Message::user(prompt)];
            match client.chat_json::<ColumnSuggestions>(&messages, 0.7).await {
                Ok(suggestions) => return suggestions,
                Err(e) => warn!(error = %e, "Column suggestion failed, using keyword fallback"),
            }
        }
        fallback_column_suggestions(message)
    }

    pub async fn support_reply(&self, message: &str) -> SupportReply {
        if let Some(client) = &self.client {
            let messages = [Message::system(SUPPORT_PROMPT), Message::user(message)];
            match client.chat_json::<SupportReply>(&messages, 0.8).await {
                Ok(reply) => return reply,
                Err(e) => warn!(error = %e, "Support reply failed, using keyword fallback"),
            }
        }
        fallback_support_reply(message)
    }
}

async fn request_column_batch(
    client: &OpenAiClient,
    name: &str,
    description: &str,
    batch: &[SearchHit],
) -> Result<Vec<String>, crate::clients::openai::OpenAiError> {
    let rows: Vec<RowContext<'_>> = batch
        .iter()
        .map(|hit| RowContext {
            title: &hit.title,
            url: &hit.url,
            snippet: &hit.snippet,
        })
        .collect();
    let rows_json = serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string());

    let system = format!(
        "You fill a custom table column for search results.\n\
         Column name: {name}\n\
         Column description: {description}\n\
         Reply with a JSON object {{\"values\": [...]}} holding exactly one short string per result, in order."
    );
    let messages = [
        Message::system(system),
        Message::user(format!("Results ({} rows): {rows_json}", batch.len())),
    ];

    let parsed: ColumnValues = client.chat_json(&messages, 0.5).await?;
    Ok(parsed.values.iter().map(value_to_text).collect())
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => MISSING_VALUE.to_string(),
        Value::String(s) if s.trim().is_empty() => MISSING_VALUE.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn fit_to_len(mut values: Vec<String>, len: usize) -> Vec<String> {
    values.truncate(len);
    values.resize(len, MISSING_VALUE.to_string());
    values
}

fn fallback_interpretation(query: &str) -> QueryInterpretation {
    let lower = query.to_lowercase();
    let mut filters = ResultFilters::default();
    let mut suggested = Vec::new();

    if lower.contains("españa") || lower.contains("spain") {
        filters.country = Some("ES".to_string());
    }
    if lower.contains("tecnología") || lower.contains("technology") {
        filters.category = Some("Tecnología".to_string());
        suggested.extend(["IA", "Software", "Hardware"].map(String::from));
    }
    if lower.contains("startup") {
        filters.category = Some("Startups".to_string());
        suggested.extend(["Financiación", "Aceleradora", "Inversión"].map(String::from));
    }
    if lower.contains("activo") || lower.contains("active") {
        filters.status = Some("Activo".to_string());
    }

    QueryInterpretation {
        search_terms: query.split_whitespace().map(str::to_string).collect(),
        filters,
        suggested_filters: suggested,
        confidence: 0.6,
    }
}

/// Placeholder values for rows `offset..offset + count`.
fn fallback_column_values(name: &str, offset: usize, count: usize) -> Vec<String> {
    const STAGES: [&str; 4] = ["Seed", "Series A", "Series B", "Growth"];
    let lower = name.to_lowercase();

    (offset..offset + count)
        .map(|i| {
            if lower.contains("funding") || lower.contains("financiación") {
                format!("€{}K", (i + 1) * 100)
            } else if lower.contains("stage") || lower.contains("etapa") {
                STAGES[i % STAGES.len()].to_string()
            } else {
                format!("Data {}", i + 1)
            }
        })
        .collect()
}

fn filter(kind: &str, value: &str, label: &str) -> FilterSuggestion {
    FilterSuggestion {
        kind: kind.to_string(),
        value: value.to_string(),
        label: label.to_string(),
    }
}

fn fallback_filter_suggestions(message: &str) -> FilterSuggestions {
    let lower = message.to_lowercase();
    let mut suggested = Vec::new();

    if lower.contains("españa") || lower.contains("spain") {
        suggested.push(filter("country", "ES", "España"));
    }
    if lower.contains("tecnología") || lower.contains("technology") {
        suggested.push(filter("category", "Tecnología", "Sector Tecnología"));
    }
    if lower.contains("startup") {
        suggested.push(filter("category", "Startups", "Startups"));
    }
    if suggested.is_empty() {
        suggested.push(filter("status", "Activo", "Estado Activo"));
    }

    FilterSuggestions {
        message: format!(
            "Basándome en tu solicitud '{message}', aquí tienes algunas sugerencias de filtros:"
        ),
        suggested_filters: suggested,
        explanation: "Estos filtros te ayudarán a refinar tu búsqueda.".to_string(),
    }
}

fn column(name: &str, description: &str, kind: &str) -> ColumnSuggestion {
    ColumnSuggestion {
        name: name.to_string(),
        description: description.to_string(),
        kind: kind.to_string(),
    }
}

fn fallback_column_suggestions(message: &str) -> ColumnSuggestions {
    let lower = message.to_lowercase();

    let suggested_columns = if lower.contains("funding") || lower.contains("financiación") {
        vec![
            column("Funding Stage", "Etapa de financiación actual", "text"),
            column("Investment Amount", "Cantidad de inversión recibida", "number"),
        ]
    } else if lower.contains("contact") || lower.contains("contacto") {
        vec![
            column("Email", "Dirección de correo electrónico", "email"),
            column("Phone", "Número de teléfono", "text"),
        ]
    } else {
        vec![
            column("Category", "Categoría o tipo de resultado", "text"),
            column("Relevance", "Puntuación de relevancia", "number"),
        ]
    };

    ColumnSuggestions {
        message: format!("Para tu solicitud '{message}', te sugiero estas columnas:"),
        suggested_columns,
        explanation: "Estas columnas te ayudarán a organizar mejor tus datos.".to_string(),
    }
}

fn support(message: &str, actions: [&str; 2], link: (&str, &str)) -> SupportReply {
    SupportReply {
        message: message.to_string(),
        suggested_actions: actions.iter().map(|a| (*a).to_string()).collect(),
        helpful_links: vec![HelpfulLink {
            title: link.0.to_string(),
            description: link.1.to_string(),
        }],
    }
}

fn fallback_support_reply(message: &str) -> SupportReply {
    let lower = message.to_lowercase();

    if lower.contains("search") || lower.contains("búsqueda") {
        support(
            "Para realizar búsquedas en RADAR, escribe tu consulta en lenguaje natural en la barra de búsqueda. El sistema interpretará tu consulta y buscará en múltiples fuentes.",
            [
                "Prueba con consultas específicas como 'startups de tecnología en España'",
                "Usa el botón 'Refinar búsqueda' para añadir filtros",
            ],
            ("Guía de búsqueda", "Aprende a hacer búsquedas efectivas"),
        )
    } else if lower.contains("filter") || lower.contains("filtro") {
        support(
            "Los filtros te permiten refinar tus resultados de búsqueda por país, categoría, idioma, estado y más.",
            [
                "Haz clic en 'Refinar búsqueda' para ver opciones de filtros",
                "Guarda tus filtros favoritos en tu perfil",
            ],
            ("Guía de filtros", "Cómo usar filtros efectivamente"),
        )
    } else if lower.contains("export") || lower.contains("exportar") {
        support(
            "Puedes exportar tus resultados a Excel o PDF desde la tabla de resultados.",
            [
                "Usa el botón 'Exportar' en la tabla de resultados",
                "Elige Excel para incluir tus columnas personalizadas",
            ],
            ("Guía de exportación", "Cómo exportar y gestionar tus reportes"),
        )
    } else {
        support(
            "¡Hola! Soy el asistente de RADAR. ¿En qué puedo ayudarte hoy?",
            [
                "Pregúntame sobre búsquedas, filtros, columnas o exportación",
                "Consulta nuestros tutoriales y guías",
            ],
            ("Documentación completa", "Guía completa de RADAR"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<SearchHit> {
        (0..n)
            .map(|i| SearchHit::new(format!("t{i}"), format!("https://x/{i}"), "Google"))
            .collect()
    }

    #[tokio::test]
    async fn test_interpretation_fallback() {
        let ai = AiService::new(None, 20);
        let interpretation = ai.interpret_query("startups activo España").await;

        assert_eq!(interpretation.filters.country.as_deref(), Some("ES"));
        assert_eq!(interpretation.filters.category.as_deref(), Some("Startups"));
        assert_eq!(interpretation.filters.status.as_deref(), Some("Activo"));
        assert!((interpretation.confidence - 0.6).abs() < f64::EPSILON);
        assert_eq!(interpretation.search_terms.len(), 3);
    }

    #[test]
    fn test_raw_interpretation_drops_null_like_filters() {
        let raw: RawInterpretation = serde_json::from_str(
            r#"{"search_terms":["a"],"filters":{"country":"ES","language":"null","category":null,"extra":"x"},"confidence":1.4}"#,
        )
        .unwrap();
        let interpretation = QueryInterpretation::from(raw);

        assert_eq!(interpretation.filters.country.as_deref(), Some("ES"));
        assert!(interpretation.filters.language.is_none());
        assert!(interpretation.filters.category.is_none());
        assert!((interpretation.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_column_values_one_per_row_across_batches() {
        let ai = AiService::new(None, 2);
        let values = ai.generate_column_values("Notes", "", &rows(5)).await;

        assert_eq!(values, vec!["Data 1", "Data 2", "Data 3", "Data 4", "Data 5"]);
    }

    #[test]
    fn test_fallback_column_values() {
        assert_eq!(fallback_column_values("Funding", 0, 2), vec!["€100K", "€200K"]);
        assert_eq!(
            fallback_column_values("Etapa", 3, 2),
            vec!["Growth".to_string(), "Seed".to_string()]
        );
    }

    #[test]
    fn test_fit_to_len_pads_and_truncates() {
        assert_eq!(fit_to_len(vec!["a".into()], 3), vec!["a", "N/A", "N/A"]);
        assert_eq!(fit_to_len(vec!["a".into(), "b".into()], 1), vec!["a"]);
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&Value::Null), "N/A");
        assert_eq!(value_to_text(&serde_json::json!(42)), "42");
        assert_eq!(value_to_text(&serde_json::json!("x")), "x");
    }

    #[tokio::test]
    async fn test_chat_fallbacks() {
        let ai = AiService::new(None, 20);

        let filters = ai.suggest_filters("tecnología en spain").await;
        assert_eq!(filters.suggested_filters.len(), 2);
        assert_eq!(filters.suggested_filters[0].value, "ES");

        let default_filters = ai.suggest_filters("algo").await;
        assert_eq!(default_filters.suggested_filters[0].kind, "status");

        let columns = ai.suggest_columns("datos de contacto", None).await;
        assert_eq!(columns.suggested_columns[0].kind, "email");

        let reply = ai.support_reply("¿Cómo exportar a PDF?").await;
        assert_eq!(reply.helpful_links[0].title, "Guía de exportación");
    }
}
