//! Medi-CoPilot CLI - Command-line front end for the medication tracker
//!
//! Plays the role the screens play in the mobile app: login and register hand
//! the returned identity to the session manager, protected commands gate on
//! the session state before talking to the backend, and logout clears it.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use medicopilot_api::{ApiClientConfig, MediApiClient};
use medicopilot_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, ErrorContext,
    MediConfig, MediError, MediResult, Medicine, TreatmentInput, TreatmentMedicine,
};
use medicopilot_session::{FileStore, SessionIdentity, SessionManager, SessionStatus};

#[derive(Parser)]
#[command(name = "medicopilot")]
#[command(about = "Track your medicines and treatment schedules")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Register {
        /// Display name
        name: String,

        /// Phone number used to log in
        phone: String,

        /// Account password
        password: String,
    },

    /// Log in and persist the session
    Login {
        /// Phone number
        phone: String,

        /// Account password
        password: String,
    },

    /// Log out and clear the persisted session
    Logout,

    /// Show the current session state
    Status,

    /// Add a medicine to your cabinet
    AddMedicine {
        /// Medicine name
        name: String,

        /// Quantity on hand
        #[arg(short, long, default_value = "1")]
        quantity: u32,

        /// Expiry date (YYYY-MM-DD)
        #[arg(short, long)]
        expiry_date: String,
    },

    /// Create a treatment schedule
    AddTreatment {
        /// Treatment name
        name: String,

        /// Medicine lines as name:dosage:frequency (repeatable)
        #[arg(short, long = "medicine", required = true)]
        medicines: Vec<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<String>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List your treatment schedules
    Treatments,

    /// Read the text off a medicine label photo
    Scan {
        /// Path to the label image (JPEG or PNG)
        image: PathBuf,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize default configuration
        #[arg(long)]
        init: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> MediResult<()> {
    let cli = Cli::parse();

    // Load configuration first so its [logging] section takes effect
    let config = load_config(cli.config.as_ref()).await?;

    let mut logging_config = config.logging.clone();
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }

    init_logging(&logging_config).map_err(|e| MediError::Config {
        message: format!("Failed to initialize logging: {}", e),
        source: Some(e),
        context: ErrorContext::new("cli")
            .with_operation("init_logging")
            .with_suggestion("Check logging configuration"),
    })?;

    info!("Starting Medi-CoPilot CLI v{}", env!("CARGO_PKG_VERSION"));

    // Execute command
    match cli.command {
        Commands::Register {
            name,
            phone,
            password,
        } => {
            handle_register(name, phone, password, &config).await?;
        }
        Commands::Login { phone, password } => {
            handle_login(phone, password, &config).await?;
        }
        Commands::Logout => {
            handle_logout(&config).await?;
        }
        Commands::Status => {
            handle_status(&config).await?;
        }
        Commands::AddMedicine {
            name,
            quantity,
            expiry_date,
        } => {
            handle_add_medicine(name, quantity, expiry_date, &config).await?;
        }
        Commands::AddTreatment {
            name,
            medicines,
            start_date,
            end_date,
            notes,
        } => {
            handle_add_treatment(name, medicines, start_date, end_date, notes, &config).await?;
        }
        Commands::Treatments => {
            handle_treatments(&config).await?;
        }
        Commands::Scan { image } => {
            handle_scan(image, &config).await?;
        }
        Commands::Config {
            show,
            init,
            validate,
        } => {
            handle_config(show, init, validate).await?;
        }
    }

    Ok(())
}

async fn load_config(config_path: Option<&PathBuf>) -> MediResult<MediConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        MediConfig::from_file(path)
    } else {
        // Try to load from default locations
        let default_paths = [
            dirs::config_dir().map(|d| d.join("medicopilot").join("config.toml")),
            dirs::home_dir().map(|d| d.join(".medicopilot").join("config.toml")),
            Some(PathBuf::from("medicopilot.toml")),
        ];

        for path_opt in default_paths.iter() {
            if let Some(path) = path_opt {
                if path.exists() {
                    info!("Loading configuration from {:?}", path);
                    return MediConfig::from_file(path);
                }
            }
        }

        info!("No configuration file found, using defaults");
        Ok(MediConfig::default())
    }
}

fn session_manager(config: &MediConfig) -> MediResult<SessionManager> {
    let data_dir = PathBuf::from(expand_home(&config.session.data_dir));
    let store = FileStore::new(data_dir)?;
    Ok(SessionManager::new(Arc::new(store)))
}

fn api_client(config: &MediConfig, identity: Option<&str>) -> MediResult<MediApiClient> {
    let mut client_config = ApiClientConfig::new(&config.api.base_url)
        .with_timeout(config.api.timeout_seconds);
    client_config.user_agent = config.api.user_agent.clone();
    if let Some(identity) = identity {
        client_config = client_config.with_identity(identity);
    }
    MediApiClient::new(client_config)
}

/// Expand a leading `~` to the home directory. A tilde anywhere else in the
/// path is an ordinary character.
fn expand_home(path: &str) -> String {
    if path != "~" && !path.starts_with("~/") {
        return path.to_string();
    }
    match dirs::home_dir() {
        Some(home) => format!("{}{}", home.to_string_lossy(), &path[1..]),
        None => path.to_string(),
    }
}

/// Gate a protected command on the session, like a protected screen mount
async fn require_identity(sessions: &SessionManager) -> MediResult<SessionIdentity> {
    match sessions.status().await {
        SessionStatus::Authenticated(identity) => Ok(identity),
        _ => Err(MediError::Authentication {
            message: "Not logged in".to_string(),
            context: ErrorContext::new("cli")
                .with_operation("require_identity")
                .with_suggestion("Run 'medicopilot login <phone> <password>' first"),
        }),
    }
}

/// The user id the backend expects alongside requests.
///
/// The identifier scheme stores it directly; the token scheme embeds the
/// subject in the claims.
fn backend_user_id(identity: &SessionIdentity) -> MediResult<String> {
    match identity {
        SessionIdentity::UserId(id) => Ok(id.clone()),
        SessionIdentity::Token(_) => {
            let claims = identity.claims()?;
            claims.sub.or(claims.phone).ok_or_else(|| MediError::Decode {
                message: "Token carries no usable subject claim".to_string(),
                context: ErrorContext::new("cli")
                    .with_operation("backend_user_id")
                    .with_suggestion("Log in again to obtain a fresh session"),
            })
        }
    }
}

async fn handle_register(
    name: String,
    phone: String,
    password: String,
    config: &MediConfig,
) -> MediResult<()> {
    log_operation_start!("register", phone = %phone);

    let api = api_client(config, None)?;
    let response = api
        .register(&name, &phone, &password)
        .await
        .map_err(|e| {
            log_operation_error!("register", e);
            e
        })?;

    log_operation_success!("register", user_id = %response.user_id);
    println!("✅ Registered! Your user id is {}", response.user_id);
    println!("👉 Log in with: medicopilot login {} <password>", phone);
    Ok(())
}

async fn handle_login(phone: String, password: String, config: &MediConfig) -> MediResult<()> {
    log_operation_start!("login", phone = %phone);

    let api = api_client(config, None)?;
    let response = api.login(&phone, &password).await.map_err(|e| {
        log_operation_error!("login", e);
        e
    })?;

    // login() guarantees an identity is present
    let identity = response.identity().unwrap_or_default().to_string();

    let sessions = session_manager(config)?;
    sessions.save(&identity).await.map_err(|e| {
        log_operation_error!("save_session", e);
        e
    })?;

    log_operation_success!("login");
    println!("✅ Logged in");
    Ok(())
}

async fn handle_logout(config: &MediConfig) -> MediResult<()> {
    log_operation_start!("logout");

    let sessions = session_manager(config)?;
    sessions.clear().await?;

    log_operation_success!("logout");
    println!("👋 Logged out");
    Ok(())
}

async fn handle_status(config: &MediConfig) -> MediResult<()> {
    let sessions = session_manager(config)?;

    match sessions.status().await {
        SessionStatus::Authenticated(SessionIdentity::Token(token)) => {
            println!("🔐 Logged in with a signed token");
            if let Ok(claims) = sessions.decode(&token) {
                if let Some(subject) = claims.sub.or(claims.phone) {
                    println!("   subject: {}", subject);
                }
                if let Some(exp) = claims.exp {
                    match chrono::DateTime::from_timestamp(exp, 0) {
                        Some(when) => println!("   expires: {}", when.to_rfc3339()),
                        None => println!("   expires: (unreadable claim)"),
                    }
                }
            }
        }
        SessionStatus::Authenticated(SessionIdentity::UserId(id)) => {
            println!("🔐 Logged in as user {}", id);
        }
        _ => {
            println!("🚪 Not logged in");
        }
    }

    Ok(())
}

async fn handle_add_medicine(
    name: String,
    quantity: u32,
    expiry_date: String,
    config: &MediConfig,
) -> MediResult<()> {
    log_operation_start!("add_medicine", name = %name);

    let sessions = session_manager(config)?;
    let identity = require_identity(&sessions).await?;
    let user_id = backend_user_id(&identity)?;

    let api = api_client(config, Some(identity.as_str()))?;
    let medicine = Medicine {
        id: None,
        name,
        quantity,
        expiry_date,
    };
    let medicine_id = api.add_medicine(&user_id, &medicine).await.map_err(|e| {
        log_operation_error!("add_medicine", e);
        e
    })?;

    log_operation_success!("add_medicine", medicine_id = %medicine_id);
    println!("💊 Medicine added ({})", medicine_id);
    Ok(())
}

async fn handle_add_treatment(
    name: String,
    medicines: Vec<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    notes: Option<String>,
    config: &MediConfig,
) -> MediResult<()> {
    log_operation_start!("add_treatment", name = %name);

    let sessions = session_manager(config)?;
    let identity = require_identity(&sessions).await?;
    let user_id = backend_user_id(&identity)?;

    let medicines = medicines
        .iter()
        .map(|spec| parse_medicine_spec(spec))
        .collect::<MediResult<Vec<_>>>()?;

    let treatment = TreatmentInput {
        user_id,
        treatment_name: name,
        medicines,
        start_date,
        end_date,
        notes,
    };

    let api = api_client(config, Some(identity.as_str()))?;
    let treatment_id = api.add_treatment(&treatment).await.map_err(|e| {
        log_operation_error!("add_treatment", e);
        e
    })?;

    log_operation_success!("add_treatment", treatment_id = %treatment_id);
    println!("📋 Treatment added ({})", treatment_id);
    Ok(())
}

async fn handle_treatments(config: &MediConfig) -> MediResult<()> {
    let sessions = session_manager(config)?;
    let identity = require_identity(&sessions).await?;
    let user_id = backend_user_id(&identity)?;

    let api = api_client(config, Some(identity.as_str()))?;
    let treatments = api.get_treatments(&user_id).await?;

    if treatments.is_empty() {
        println!("📭 No treatments yet");
        return Ok(());
    }

    for treatment in treatments {
        println!("📋 {}", treatment.treatment_name);
        if let Some(start) = &treatment.start_date {
            let end = treatment.end_date.as_deref().unwrap_or("ongoing");
            println!("   {} → {}", start, end);
        }
        for medicine in &treatment.medicines {
            println!(
                "   💊 {} — {} ({})",
                medicine.medicine_name, medicine.dosage, medicine.frequency
            );
        }
        if !treatment.notes.is_empty() {
            println!("   📝 {}", treatment.notes);
        }
    }

    Ok(())
}

/// The scan screen is reachable without logging in, so no session gate here
async fn handle_scan(image: PathBuf, config: &MediConfig) -> MediResult<()> {
    log_operation_start!("scan", image = ?image);

    let api = api_client(config, None)?;
    let text = api.extract_text(&image).await.map_err(|e| {
        log_operation_error!("scan", e);
        e
    })?;

    log_operation_success!("scan", chars = text.len());
    if text.trim().is_empty() {
        println!("🔍 No text found on the label");
    } else {
        println!("🔍 Label text:");
        println!("{}", text.trim());
    }
    Ok(())
}

fn parse_medicine_spec(spec: &str) -> MediResult<TreatmentMedicine> {
    let mut parts = spec.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(dosage), Some(frequency))
            if !name.is_empty() && !dosage.is_empty() && !frequency.is_empty() =>
        {
            Ok(TreatmentMedicine {
                medicine_name: name.to_string(),
                dosage: dosage.to_string(),
                frequency: frequency.to_string(),
            })
        }
        _ => Err(MediError::Validation {
            message: format!("Invalid medicine spec: {:?}", spec),
            field: Some("medicine".to_string()),
            context: ErrorContext::new("cli")
                .with_operation("parse_medicine_spec")
                .with_suggestion("Use name:dosage:frequency, e.g. Amoxicillin:500mg:3x-daily"),
        }),
    }
}

async fn handle_config(show: bool, init: bool, validate: bool) -> MediResult<()> {
    if init {
        let config = MediConfig::default();
        let config_dir = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("medicopilot");

        tokio::fs::create_dir_all(&config_dir).await?;
        let config_path = config_dir.join("config.toml");

        config.save_to_file(&config_path)?;
        println!("✅ Configuration initialized at: {:?}", config_path);
        println!("📝 Edit the file to point api.base_url at your backend.");
    }

    if show {
        let config = load_config(None).await?;
        println!("📋 Current configuration:");
        println!("{}", toml::to_string_pretty(&config).unwrap_or_default());
    }

    if validate {
        let config = load_config(None).await?;
        match config.validate() {
            Ok(()) => println!("✅ Configuration is valid"),
            Err(e) => {
                println!("❌ Configuration validation failed: {}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}
