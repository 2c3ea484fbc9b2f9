pub mod backend;
pub mod categorize;
pub mod fallback;
pub mod normalize;
pub mod openai;
pub mod pipeline;

pub use backend::{
    AiError, AiExtraction, DisabledBackend, ExtractionBackend, ExtractionRequest, MockBackend,
};
pub use categorize::{Categorizer, CategorizerError, KeywordRule};
pub use fallback::RegexExtractor;
pub use normalize::{normalize_body, normalize_line, strip_html_tags};
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use pipeline::ExtractionPipeline;
