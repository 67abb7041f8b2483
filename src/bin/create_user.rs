use std::io::{self, Write};

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use mindline_api::auth::identity::Role;
use mindline_api::auth::passwords::PasswordService;

#[derive(Parser, Debug)]
#[command(name = "create_user", about = "Provision a Mindline user account")]
struct Args {
    /// Email address for the account (case insensitive).
    #[arg(long)]
    email: String,

    /// Plaintext password to hash and store for this user.
    #[arg(long)]
    password: String,

    /// Optional display name to associate with the account.
    #[arg(long)]
    display_name: Option<String>,

    /// Role to assign (`patient`, `therapist`, `admin` or `growth_manager`).
    #[arg(long, default_value = "patient")]
    role: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let email = args.email.trim().to_lowercase();

    if !email.contains('@') {
        writeln!(io::stderr(), "error: email must contain '@'")?;
        std::process::exit(1);
    }

    let role = args.role.trim().to_lowercase();
    if Role::from_str(&role).as_str() != role {
        writeln!(
            io::stderr(),
            "error: unsupported role '{role}'. Use 'patient', 'therapist', 'admin' or 'growth_manager'."
        )?;
        std::process::exit(1);
    }

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    let passwords = PasswordService::new()?;
    let password_hash = passwords.hash_password(args.password.trim())?;

    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, display_name, role, password_hash) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&email)
    .bind(args.display_name.as_deref())
    .bind(&role)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    log::info!("created user {user_id} ({email}) with role {role}");

    Ok(())
}
