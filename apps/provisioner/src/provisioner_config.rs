use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use vams_application::{AccessTables, AdminBootstrap};
use vams_core::AppError;
use vams_domain::{PermissionVerb, PrecedencePolicy, ResourceAttributes};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessCheck {
    pub user_id: String,
    pub mfa_enabled: bool,
    pub verb: PermissionVerb,
    pub resource: ResourceAttributes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionerCommand {
    Provision,
    Migrate,
    MigrateLegacy,
    Check(AccessCheck),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionerConfig {
    pub command: ProvisionerCommand,
    pub store_backend: StoreBackend,
    pub tables: AccessTables,
    pub admin: Option<AdminBootstrap>,
    pub seed_catalog_path: Option<PathBuf>,
    pub precedence_policy: PrecedencePolicy,
}

impl ProvisionerConfig {
    pub fn load() -> Result<Self, AppError> {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::from_sources(&args, |name| env::var(name).ok())
    }

    pub fn from_sources(
        args: &[String],
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let value = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let command = parse_command(args)?;

        let store_backend = match value("STORE_BACKEND")
            .unwrap_or_else(|| "postgres".to_owned())
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres {
                database_url: value("DATABASE_URL").ok_or_else(|| {
                    AppError::Validation("DATABASE_URL is required".to_owned())
                })?,
            },
            other => {
                return Err(AppError::Validation(format!(
                    "STORE_BACKEND must be either 'memory' or 'postgres', got '{other}'"
                )));
            }
        };

        if command == ProvisionerCommand::Migrate && store_backend == StoreBackend::Memory {
            return Err(AppError::Validation(
                "the migrate command needs STORE_BACKEND=postgres".to_owned(),
            ));
        }

        let defaults = AccessTables::default();
        let tables = AccessTables {
            roles: value("ROLES_TABLE_NAME").unwrap_or(defaults.roles),
            constraints: value("CONSTRAINTS_TABLE_NAME").unwrap_or(defaults.constraints),
            users: value("USERS_TABLE_NAME").unwrap_or(defaults.users),
            user_roles: value("USER_ROLES_TABLE_NAME").unwrap_or(defaults.user_roles),
        };

        let admin = match (value("ADMIN_USER_ID"), value("ADMIN_EMAIL")) {
            (Some(user_id), Some(email)) => Some(AdminBootstrap { user_id, email }),
            (None, None) => None,
            _ => {
                return Err(AppError::Validation(
                    "ADMIN_USER_ID and ADMIN_EMAIL must be set together".to_owned(),
                ));
            }
        };

        let precedence_policy = value("ACCESS_PRECEDENCE_POLICY")
            .map(|policy| PrecedencePolicy::from_str(policy.as_str()))
            .transpose()
            .map_err(|error| {
                AppError::Validation(format!("invalid ACCESS_PRECEDENCE_POLICY: {error}"))
            })?
            .unwrap_or_default();

        Ok(Self {
            command,
            store_backend,
            tables,
            admin,
            seed_catalog_path: value("SEED_CATALOG_PATH").map(PathBuf::from),
            precedence_policy,
        })
    }
}

fn parse_command(args: &[String]) -> Result<ProvisionerCommand, AppError> {
    match args.first().map(String::as_str) {
        None | Some("provision") => Ok(ProvisionerCommand::Provision),
        Some("migrate") => Ok(ProvisionerCommand::Migrate),
        Some("migrate-legacy") => Ok(ProvisionerCommand::MigrateLegacy),
        Some("check") => parse_check(&args[1..]).map(ProvisionerCommand::Check),
        Some(other) => Err(AppError::Validation(format!(
            "unknown command '{other}', expected provision, migrate, migrate-legacy or check"
        ))),
    }
}

// check [--mfa] USER_ID VERB OBJECT_TYPE [FIELD=VALUE]...
fn parse_check(args: &[String]) -> Result<AccessCheck, AppError> {
    let mfa_enabled = args.first().is_some_and(|arg| arg == "--mfa");
    let args = if mfa_enabled { &args[1..] } else { args };

    let [user_id, verb, object_type, fields @ ..] = args else {
        return Err(AppError::Validation(
            "usage: check [--mfa] USER_ID VERB OBJECT_TYPE [FIELD=VALUE]...".to_owned(),
        ));
    };

    let mut resource = ResourceAttributes::for_object(object_type.parse()?);
    for field in fields {
        let (name, value) = field.split_once('=').ok_or_else(|| {
            AppError::Validation(format!("resource field '{field}' must look like FIELD=VALUE"))
        })?;
        resource = if value.contains(',') {
            resource.with_list(name, value.split(','))
        } else {
            resource.with_text(name, value)
        };
    }

    Ok(AccessCheck {
        user_id: user_id.clone(),
        mfa_enabled,
        verb: verb.parse()?,
        resource,
    })
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
