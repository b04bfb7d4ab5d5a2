use crate::models::result::SearchHit;

/// Built-in results served in place of a provider that has no credentials.
#[must_use]
pub fn sample_hits() -> Vec<SearchHit> {
    [
        (
            "Última hora: Avance tecnológico revolucionario",
            "https://example.com/tech-breakthrough",
            "USA",
            "Inglés",
            "2024-01-15",
            "Tecnología",
            "Activo",
            "TechNews",
            95,
        ),
        (
            "Análisis de mercado: Resultados del Q4",
            "https://example.com/market-analysis",
            "UK",
            "Inglés",
            "2024-01-14",
            "Finanzas",
            "Pendiente",
            "FinanceDaily",
            87,
        ),
        (
            "Estudio del impacto del cambio climático",
            "https://example.com/climate-study",
            "DE",
            "Alemán",
            "2024-01-13",
            "Medio Ambiente",
            "Activo",
            "ScienceJournal",
            92,
        ),
        (
            "Informe de innovación en salud",
            "https://example.com/healthcare-report",
            "CA",
            "Inglés",
            "2024-01-12",
            "Salud",
            "Completado",
            "MedNews",
            89,
        ),
        (
            "Tendencias en desarrollo de IA",
            "https://example.com/ai-trends",
            "JP",
            "Japonés",
            "2024-01-11",
            "Tecnología",
            "Activo",
            "AIToday",
            94,
        ),
    ]
    .into_iter()
    .map(
        |(title, url, country, language, date, category, status, source, score)| SearchHit {
            title: title.to_string(),
            url: url.to_string(),
            snippet: String::new(),
            country: country.to_string(),
            language: language.to_string(),
            date: date.to_string(),
            category: category.to_string(),
            status: status.to_string(),
            source: source.to_string(),
            score,
            metadata: None,
        },
    )
    .collect()
}
