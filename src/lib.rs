#[macro_use]
extern crate rocket;

pub mod auth;
pub mod db;
pub mod request_logger;
pub mod routes;

use std::sync::{Arc, Once};

use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};

use crate::auth::{AuthConfig, AuthState, IdentityStore, PgIdentityStore};
use crate::db::MindlineDb;
use crate::request_logger::RequestLogger;

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Put, Method::Delete]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(MindlineDb::init())
        .attach(cors)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite(
            "Run Migrations",
            |rocket| async move {
                match MindlineDb::fetch(&rocket) {
                    Some(database) => {
                        let pool = (**database).clone();
                        match db::MIGRATOR.run(&pool).await {
                            Ok(_) => {
                                log::info!("database migrations successful");
                                Ok(rocket)
                            }
                            Err(err) => {
                                log::error!("database migrations failed: {err}");
                                Err(rocket)
                            }
                        }
                    }
                    None => {
                        log::error!("database pool not available for migrations");
                        Err(rocket)
                    }
                }
            },
        ))
        // Build the auth state from environment configuration. A missing
        // signing secret aborts startup here rather than failing requests.
        .attach(AdHoc::try_on_ignite("Auth State", |rocket| async move {
            let config = match AuthConfig::from_env() {
                Ok(config) => config,
                Err(err) => {
                    log::error!("auth configuration invalid: {err}");
                    return Err(rocket);
                }
            };

            match MindlineDb::fetch(&rocket) {
                Some(database) => {
                    let pool = (**database).clone();
                    let identities: Arc<dyn IdentityStore> =
                        Arc::new(PgIdentityStore::new(pool));
                    match AuthState::new(config, identities) {
                        Ok(state) => Ok(rocket.manage(state)),
                        Err(err) => {
                            log::error!("failed to build auth state: {err}");
                            Err(rocket)
                        }
                    }
                }
                None => {
                    log::error!("database pool not available for auth state");
                    Err(rocket)
                }
            }
        }))
        .mount(
            "/api/v1",
            openapi_get_routes![
                routes::health::health_check,
                auth::routes::login,
                auth::routes::refresh,
                auth::routes::me,
                auth::routes::signing_keys,
            ],
        )
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Mindline API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use std::sync::Arc;

    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use uuid::Uuid;

    use crate::auth::identity::{Identity, MemoryIdentityStore, Role};
    use crate::auth::{AuthConfig, AuthState};

    pub fn test_auth_config() -> AuthConfig {
        AuthConfig {
            issuer: "https://mindline.test".into(),
            audience: "mindline-mobile".into(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 7 * 24 * 60 * 60,
            access_token_secret: "access-test-secret".into(),
            refresh_token_secret: "refresh-test-secret".into(),
        }
    }

    /// Auth state wired to a fresh in-memory identity store, so the full
    /// login/verify/rotate pipeline runs without a database.
    pub fn memory_auth_state() -> (AuthState, Arc<MemoryIdentityStore>) {
        let store = Arc::new(MemoryIdentityStore::new());
        let state = AuthState::new(test_auth_config(), store.clone()).expect("auth state");
        (state, store)
    }

    /// Seed an identity, hashing the password when one is given.
    pub fn seed_identity(
        state: &AuthState,
        store: &MemoryIdentityStore,
        email: &str,
        role: Role,
        password: Option<&str>,
    ) -> Identity {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: None,
            role,
            disabled: false,
        };
        let hash =
            password.map(|pw| state.passwords.hash_password(pw).expect("password hashes"));
        store.insert(identity.clone(), hash);
        identity
    }

    /// Builder for constructing Rocket instances tailored for tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        auth_state: Option<AuthState>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging off.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                auth_state: None,
            }
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        /// Manage an `AuthState` so guards and auth routes can resolve it.
        pub fn manage_auth_state(mut self, state: AuthState) -> Self {
            self.auth_state = Some(state);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(state) = self.auth_state {
                rocket = rocket.manage(state);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
