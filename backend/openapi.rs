//! OpenAPI documentation aggregation.

use utoipa::OpenApi;

use crate::docforge::analyze::types as analyze_types;
use crate::docforge::export::types as export_types;
use crate::docforge::extract::types as extract_types;
use crate::docforge::rag::types as rag_types;
use crate::docforge::templates::types as template_types;

/// API documentation for the document-analysis service
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::docforge::extract::handlers::upload_file,
        crate::docforge::extract::handlers::parse_file,
        crate::docforge::analyze::handlers::analyze,
        crate::docforge::analyze::handlers::batch_analyze,
        crate::docforge::analyze::handlers::health,
        crate::docforge::templates::handlers::validate,
        crate::docforge::export::handlers::export,
        crate::docforge::export::handlers::download,
        crate::docforge::rag::handlers::index_dataset_file,
        crate::docforge::rag::handlers::search,
        crate::docforge::rag::handlers::context,
        crate::docforge::rag::handlers::stats,
        crate::docforge::rag::handlers::remove_dataset,
    ),
    components(schemas(
        extract_types::FileType,
        extract_types::UploadedFile,
        extract_types::EnrichmentMetadata,
        extract_types::ParagraphRecord,
        extract_types::ExtractionMethod,
        extract_types::ParsedDocument,
        extract_types::ParseRequest,
        analyze_types::AnalyzeOptions,
        analyze_types::AnalyzeRequest,
        analyze_types::BatchAnalyzeRequest,
        analyze_types::EntityLabel,
        analyze_types::Entity,
        analyze_types::KeywordType,
        analyze_types::Keyword,
        analyze_types::SentimentClass,
        analyze_types::Sentiment,
        analyze_types::Statistics,
        analyze_types::Summary,
        analyze_types::AnalysisResult,
        analyze_types::AggregatedEntity,
        analyze_types::AggregatedKeyword,
        analyze_types::AggregatedSentiment,
        analyze_types::AggregatedStatistics,
        analyze_types::BatchAnalysisResult,
        analyze_types::AnalyzerHealth,
        analyze_types::AnalyzerFeatures,
        template_types::FieldType,
        template_types::TemplateField,
        template_types::AnnotationSchema,
        template_types::DatasetTemplate,
        template_types::ValidationReport,
        export_types::ExportFormat,
        export_types::ExportRequest,
        export_types::ExportResult,
        rag_types::RagDocument,
        rag_types::SearchScope,
        rag_types::SearchRequest,
        rag_types::SearchResult,
        rag_types::ContextRequest,
        rag_types::ContextItem,
        rag_types::IndexRequest,
        rag_types::IndexResponse,
        rag_types::RagStats,
        rag_types::RagStatsResponse,
    )),
    tags(
        (name = "Extraction", description = "Upload and paragraph extraction"),
        (name = "Mining", description = "Single-text and batch analysis"),
        (name = "Templates", description = "Dataset template validation"),
        (name = "Export", description = "CSV/JSONL export"),
        (name = "RAG", description = "Vector index and context assembly"),
    )
)]
pub struct ApiDoc;
