use chrono::Utc;
use clap::{Parser, Subcommand};
use confesshub_backend::config::Config;
use confesshub_backend::helper::account_helpers;
use confesshub_backend::models::db_operations::posts_db_operations::RedbPostRepository;
use confesshub_backend::models::db_operations::users_db_operations::{self, SqliteUserRepository};
use confesshub_backend::setup::db_setup;
use confesshub_backend::{build_pool, DbPool};
use redb::Database;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial ConfessHub setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Create the schema. Pass `accounts` or `posts` to set up only one store.
    Setup { db_type: Option<String> },
    /// Insert a few sample confessions.
    Seed,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        new_password: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::from_env(&cli.env_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup { db_type } => match db_type.as_deref() {
                Some("accounts") => setup_accounts_database(&config),
                Some("posts") => setup_posts_database(&config),
                Some(other) => eprintln!("❌ Error: Unknown database type '{}'. Use 'accounts' or 'posts'.", other),
                None => {
                    setup_accounts_database(&config);
                    setup_posts_database(&config);
                }
            },
            DbAction::Seed => seed_posts(&config),
        },
        Commands::Admin { action } => match action {
            AdminAction::Create { email, password } => create_admin_user(&config, email, password),
            AdminAction::List => list_admin_users(&config),
            AdminAction::ChangePassword { email, new_password } => change_admin_password(&config, email, new_password),
        },
    }
}

fn ensure_parent_dir(db_path: &Path) -> bool {
    if let Some(parent_dir) = db_path.parent() {
        if let Err(e) = fs::create_dir_all(parent_dir) {
            eprintln!("❌ Could not create database directory '{}': {}", parent_dir.display(), e);
            return false;
        }
    }
    true
}

fn setup_accounts_database(config: &Config) {
    let db_path = config.accounts_db_path();
    println!("\nSetting up accounts database at '{}'...", db_path.display());
    if !ensure_parent_dir(&db_path) {
        return;
    }

    let mut conn = match Connection::open(&db_path) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("❌ Could not open accounts database file: {}", e);
            return;
        }
    };
    match db_setup::setup_accounts_db(&mut conn) {
        Ok(_) => println!("✅ Accounts database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up accounts database: {}", e),
    }
}

fn open_posts_database(config: &Config) -> Option<Database> {
    let db_path = config.posts_db_path();
    if !ensure_parent_dir(&db_path) {
        return None;
    }
    match Database::create(&db_path) {
        Ok(db) => Some(db),
        Err(e) => {
            eprintln!("❌ Could not open posts database file: {}", e);
            None
        }
    }
}

fn setup_posts_database(config: &Config) {
    println!("\nSetting up posts database at '{}'...", config.posts_db_path().display());
    let Some(db) = open_posts_database(config) else {
        return;
    };
    match db_setup::setup_posts_db(&db) {
        Ok(_) => println!("✅ Posts database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up posts database: {}", e),
    }
}

fn seed_posts(config: &Config) {
    let Some(db) = open_posts_database(config) else {
        return;
    };
    if let Err(e) = db_setup::setup_posts_db(&db) {
        eprintln!("❌ Error preparing posts database: {}", e);
        return;
    }
    let repo = RedbPostRepository::new(db);
    match db_setup::seed_sample_posts(&repo) {
        Ok(count) => println!("✅ Seeded {} sample confessions.", count),
        Err(e) => eprintln!("❌ Error seeding posts: {}", e),
    }
}

fn open_accounts_pool(config: &Config) -> Option<DbPool> {
    let db_path = config.accounts_db_path();
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Accounts database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return None;
    }
    match build_pool(&db_path) {
        Ok(pool) => Some(pool),
        Err(e) => {
            eprintln!("❌ Could not open accounts database: {}", e);
            None
        }
    }
}

fn create_admin_user(config: &Config, email: &str, password: &str) {
    let Some(pool) = open_accounts_pool(config) else {
        return;
    };
    let users = SqliteUserRepository::new(pool);
    match account_helpers::create_account(
        &users,
        email,
        password,
        true,
        config.password_hash_cost,
        Utc::now(),
        &mut rand::thread_rng(),
    ) {
        Ok(user) => println!("✅ Admin user '{}' created successfully (id {}).", user.email, user.id),
        Err(e) => eprintln!("❌ Error creating admin user: {}", e),
    }
}

fn list_admin_users(config: &Config) {
    let Some(pool) = open_accounts_pool(config) else {
        return;
    };
    let emails = pool
        .get()
        .map_err(|e| e.to_string())
        .and_then(|conn| users_db_operations::read_admin_emails(&conn).map_err(|e| e.to_string()));

    match emails {
        Ok(emails) => {
            println!("Listing Admin Users:");
            for email in emails {
                println!("- {}", email);
            }
        }
        Err(e) => eprintln!("❌ Error fetching admins: {}", e),
    }
}

fn change_admin_password(config: &Config, email: &str, new_password: &str) {
    let Some(pool) = open_accounts_pool(config) else {
        return;
    };
    let users = SqliteUserRepository::new(pool);
    match account_helpers::change_password(&users, email, new_password, config.password_hash_cost) {
        Ok(()) => println!("✅ Password for '{}' changed successfully.", email),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}
