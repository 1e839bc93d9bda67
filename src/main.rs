use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{http::header, web, App, HttpServer};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;

use carelink_signup::config::{Backend, Config};
use carelink_signup::handlers::registration_handler::RegistrationWorkflow;
use carelink_signup::rest_handlers::signup::{configure, SignupState};
use carelink_signup::utils::auth::Mailer;
use carelink_signup::utils::documents::{
    DocumentStore, FirestoreDocuments, MemoryDocuments, PostgresDocuments,
};
use carelink_signup::utils::identity::{
    FirebaseIdentity, IdentityProvider, MemoryIdentity, PostgresIdentity,
};

async fn build_workflow(
    backend: &Backend,
) -> Result<RegistrationWorkflow, Box<dyn std::error::Error>> {
    let identity: Arc<dyn IdentityProvider>;
    let documents: Arc<dyn DocumentStore>;
    match backend {
        Backend::Memory => {
            log::warn!("using in-memory accounts and profiles, nothing is persisted");
            identity = Arc::new(MemoryIdentity::new());
            documents = Arc::new(MemoryDocuments::new());
        }
        Backend::Firebase(firebase) => {
            let client = reqwest::Client::new();
            log::info!("using Firebase project {}", firebase.project_id);
            identity = Arc::new(FirebaseIdentity::new(client.clone(), firebase));
            documents = Arc::new(FirestoreDocuments::new(client, firebase));
        }
        Backend::Postgres { database_url, smtp } => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            log::info!("connected to PostgreSQL");
            identity = Arc::new(PostgresIdentity::new(pool.clone(), Mailer::new(smtp)?));
            documents = Arc::new(PostgresDocuments::new(pool));
        }
    }
    Ok(RegistrationWorkflow::new(identity, documents))
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let workflow = build_workflow(&config.backend).await?;
    let state = web::Data::new(SignupState::new(workflow, config.login_route.clone()));

    let addr = config.bind_addr();
    log::info!("signup server running at {}", addr);

    let allowed_origin = config.allowed_origin.clone();
    HttpServer::new(move || {
        let cors = match &allowed_origin {
            Some(origin) => Cors::default().allowed_origin(origin),
            None => Cors::default().allow_any_origin(),
        }
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
