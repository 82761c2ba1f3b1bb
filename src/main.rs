use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use resume_match::config::{IndexBackend, RerankMethod, Settings};
use resume_match::core::{CrossEncoderSignal, PreferenceSignal, RelevanceSignal, VectorIndex};
use resume_match::routes::{self, handle_json_payload_error, handle_query_payload_error, AppState};
use resume_match::services::{CrossEncoderClient, InMemoryIndex, OpenAiClient, PineconeClient};
use resume_match::{MatchPipeline, PipelineSources};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::other(format!("{}: {}", context, err))
}

fn build_pipeline(settings: &Settings) -> std::io::Result<MatchPipeline> {
    let openai = Arc::new(
        OpenAiClient::new(&settings.openai, settings.embedding.dimension)
            .map_err(|e| startup_error("Failed to create OpenAI client", e))?,
    );
    info!(
        "OpenAI client initialized (chat: {}, embeddings: {})",
        settings.openai.chat_model, settings.openai.embedding_model
    );

    let index: Arc<dyn VectorIndex> = match settings.index.backend {
        IndexBackend::Pinecone => Arc::new(
            PineconeClient::new(&settings.pinecone)
                .map_err(|e| startup_error("Failed to create Pinecone client", e))?,
        ),
        IndexBackend::Memory => Arc::new(
            InMemoryIndex::load(&settings.index.jobs_file, settings.embedding.dimension)
                .map_err(|e| startup_error("Failed to load job corpus", e))?,
        ),
    };
    info!("Job index: {}", index.name());

    let signal: Option<Arc<dyn RelevanceSignal>> = match settings.reranking.method {
        RerankMethod::Preference => Some(Arc::new(PreferenceSignal::new(settings.reranking.weights))),
        RerankMethod::CrossEncoder => {
            let client = CrossEncoderClient::new(&settings.reranking)
                .map_err(|e| startup_error("Failed to create cross-encoder client", e))?;
            Some(Arc::new(CrossEncoderSignal::new(client, settings.reranking.blend_weight)))
        }
        RerankMethod::None => None,
    };
    info!("Reranking method: {:?}", settings.reranking.method);

    Ok(MatchPipeline::from_settings(
        settings,
        PipelineSources {
            preferences: openai.clone(),
            embeddings: openai,
            index,
            signal,
        },
    ))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_logging(&settings);
    info!("Starting resume matching service...");

    let pipeline = build_pipeline(&settings)?;
    let app_state = AppState { pipeline };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);
    let max_body_bytes = settings.server.max_body_bytes;

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::PayloadConfig::new(max_body_bytes))
            .app_data(
                web::JsonConfig::default()
                    .limit(max_body_bytes)
                    .error_handler(handle_json_payload_error),
            )
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
