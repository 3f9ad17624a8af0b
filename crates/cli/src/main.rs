use clap::{Parser, Subcommand};
use healthdesk_core::{
    constants::DEFAULT_DATA_DIR, identity_scheme_from_env_value, store_backend_from_env_value,
    upload_keywords_from_env_value, CoreConfig, Dashboard, PatientRecord, PatientService,
    PatientError, RegistrationForm,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "healthdesk")]
#[command(about = "HealthDesk patient record desk CLI")]
struct Cli {
    /// Directory holding the record store and uploads
    #[arg(long, global = true, env = "HEALTHDESK_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// Store backend: memory, json or csv
    #[arg(long, global = true, env = "HEALTHDESK_STORE")]
    store: Option<String>,
    /// Identity scheme: email, name-phone or generated
    #[arg(long, global = true, env = "HEALTHDESK_IDENTITY")]
    identity: Option<String>,
    /// Comma-separated keywords to look for in text uploads
    #[arg(long, global = true, env = "HEALTHDESK_KEYWORDS")]
    keywords: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new record
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: Option<String>,
        /// patient (default) or doctor
        #[arg(long)]
        role: Option<String>,
        /// male, female, other or unspecified
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        age: Option<String>,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: Option<String>,
        /// Height in centimetres
        #[arg(long)]
        height: Option<String>,
        /// Weight in kilograms
        #[arg(long)]
        weight: Option<String>,
    },
    /// Log in by name and phone
    Login { name: String, phone: String },
    /// Log in by identity (email or generated id)
    LoginId { id: String },
    /// Show the full dashboard of a record
    Dashboard { id: String },
    /// Upload a file and attach it to a record
    Upload {
        /// Record identity
        id: String,
        /// File to upload
        file: PathBuf,
        /// Declared type (pdf, png, jpg, jpeg, txt or a MIME type)
        #[arg(long = "type")]
        declared_type: Option<String>,
    },
    /// Save the content of an attachment to a file
    Attachment {
        /// Record identity
        id: String,
        /// SHA-256 of the attachment, as shown by `dashboard`
        hash: String,
        /// Where to write the content (default: the original filename)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List all records
    List,
}

const EXIT_FAILURE: u8 = 1;
/// Exit status for errors the user can fix by changing their input.
const EXIT_USER_ERROR: u8 = 2;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_status_for(&err))
        }
    }
}

fn exit_status_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PatientError>() {
        Some(e) if e.is_user_error() => EXIT_USER_ERROR,
        _ => EXIT_FAILURE,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        println!("Use 'healthdesk --help' for commands");
        return Ok(());
    };

    let cfg = CoreConfig::new(
        cli.data_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        store_backend_from_env_value(cli.store)?,
        identity_scheme_from_env_value(cli.identity)?,
        upload_keywords_from_env_value(cli.keywords),
    )?;
    let mut service = PatientService::open(&cfg)?;

    match command {
        Commands::Register {
            name,
            phone,
            email,
            role,
            gender,
            age,
            dob,
            height,
            weight,
        } => {
            let form = RegistrationForm {
                role,
                name,
                gender,
                age,
                phone,
                email,
                date_of_birth: dob,
                height_cm: height,
                weight_kg: weight,
            };
            let record = service.register(&form)?;
            println!("Registered {} with identity: {}", record.name, record.id);
            if let Some(bmi) = record.bmi() {
                println!("BMI: {bmi:.2}");
            }
        }
        Commands::Login { name, phone } => {
            let dashboard = service.login(&name, &phone)?;
            print_welcome(&dashboard);
        }
        Commands::LoginId { id } => {
            let dashboard = service.login_by_id(&id)?;
            print_welcome(&dashboard);
        }
        Commands::Dashboard { id } => {
            let dashboard = service.dashboard(&id)?;
            print_dashboard(&dashboard);
        }
        Commands::Upload {
            id,
            file,
            declared_type,
        } => {
            let content = std::fs::read(&file)?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let attachment =
                service.upload(&id, &filename, declared_type.as_deref(), &content)?;
            println!(
                "Uploaded {} ({}, {} bytes) as {}",
                attachment.filename, attachment.kind, attachment.size_bytes, attachment.stored_path
            );
            match attachment.tag {
                Some(tag) => println!("Tagged: {tag}"),
                None => println!("No keywords found"),
            }
        }
        Commands::Attachment { id, hash, out } => {
            let (attachment, content) = service.attachment_content(&id, &hash)?;
            let out = out.unwrap_or_else(|| PathBuf::from(attachment.filename.as_str()));
            std::fs::write(&out, &content)?;
            println!(
                "Saved {} ({} bytes) to {}",
                attachment.filename,
                content.len(),
                out.display()
            );
        }
        Commands::List => {
            let records = service.list();
            if records.is_empty() {
                println!("No records found.");
            } else {
                for record in records {
                    print_summary(record);
                }
            }
        }
    }

    Ok(())
}

fn print_summary(record: &PatientRecord) {
    let bmi = record
        .bmi()
        .map(|b| format!("{b:.2}"))
        .unwrap_or_else(|| "-".into());
    println!(
        "ID: {}, Name: {}, Role: {}, Phone: {}, BMI: {}, Attachments: {}",
        record.id,
        record.name,
        record.role,
        record.phone,
        bmi,
        record.attachments.len()
    );
}

fn print_welcome(dashboard: &Dashboard) {
    println!(
        "Welcome, {} ({})",
        dashboard.record.name, dashboard.record.id
    );
    match &dashboard.triage {
        Some(triage) => {
            println!("BMI: {:.2} ({})", triage.bmi, triage.status);
            println!("{}", triage.advice);
        }
        None => println!("No height/weight on record."),
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    let record = &dashboard.record;
    print_welcome(dashboard);
    println!("Role: {}", record.role);
    println!("Gender: {}", record.gender);
    if let Some(age) = record.age {
        println!("Age: {age}");
    }
    println!("Phone: {}", record.phone);
    if let Some(email) = &record.email {
        println!("Email: {email}");
    }
    if let Some(dob) = record.date_of_birth {
        println!("Date of birth: {dob}");
    }
    if let Some(b) = record.biometrics {
        println!("Height: {} cm, Weight: {} kg", b.height_cm(), b.weight_kg());
    }
    println!("Registered: {}", record.registered_at.to_rfc3339());
    if record.attachments.is_empty() {
        println!("Attachments: none");
    } else {
        println!("Attachments:");
        for a in &record.attachments {
            let tag = a.tag.as_deref().unwrap_or("-");
            println!(
                "  {} [{}] {} bytes, tag: {}, hash: {}",
                a.filename, a.kind, a.size_bytes, tag, a.hash
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_exit_with_their_own_status() {
        let err = anyhow::Error::from(PatientError::NotFound("a@x.com".into()));
        assert_eq!(exit_status_for(&err), EXIT_USER_ERROR);

        let err = anyhow::Error::from(PatientError::CorruptStore("bad row".into()));
        assert_eq!(exit_status_for(&err), EXIT_FAILURE);

        let err = anyhow::anyhow!("could not read file");
        assert_eq!(exit_status_for(&err), EXIT_FAILURE);
    }
}
