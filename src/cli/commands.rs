//! Command execution

use serde::Serialize;
use tracing::info;

use super::{Cli, Command, VisitorArgs};
use crate::config::AppConfig;
use crate::domain::experiment::AlternativeStatistics;
use crate::domain::visitor::VisitorContext;
use crate::domain::DomainError;
use crate::infrastructure::logging;
use crate::infrastructure::services::ParticipationService;
use crate::infrastructure::storage::{StorageConfig, StorageFactory, StorageType};

/// Statistics document printed by `stats`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReport {
    pub experiment: String,
    pub total_participants: u64,
    pub total_completed: u64,
    pub alternatives: Vec<AlternativeStatistics>,
}

/// Load configuration, connect storage and run one command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    let storage = StorageFactory::create(&persistent_storage_config(&config)?).await?;
    let filter = config.exclusion.build_filter()?;
    let visitor = visitor_context(&cli.visitor);

    info!(client_id = %visitor.client_id(), "Running command");

    let service = ParticipationService::new(storage, visitor, filter);
    let output = execute(&service, cli.command).await?;

    if !output.is_empty() {
        println!("{}", output);
    }

    Ok(())
}

/// Each invocation is a separate process, so in-memory storage would lose
/// every count as soon as the command exits
fn persistent_storage_config(config: &AppConfig) -> Result<StorageConfig, DomainError> {
    let storage_config = config.storage.to_storage_config()?;

    if storage_config.storage_type() == StorageType::InMemory {
        return Err(DomainError::configuration(
            "in-memory storage is not kept between CLI runs; \
             set storage.type to redis or postgres (e.g. SPLIT__STORAGE__TYPE=redis)",
        ));
    }

    Ok(storage_config)
}

fn visitor_context(args: &VisitorArgs) -> VisitorContext {
    let mut visitor = match &args.client_id {
        Some(client_id) => VisitorContext::new(client_id.as_str()),
        None => VisitorContext::anonymous(),
    };

    if let Some(ip_address) = &args.ip_address {
        visitor = visitor.with_ip_address(ip_address.as_str());
    }

    if let Some(user_agent) = &args.user_agent {
        visitor = visitor.with_user_agent(user_agent.as_str());
    }

    visitor
}

/// Run a command and render what it prints; empty means nothing to print
async fn execute(service: &ParticipationService, command: Command) -> anyhow::Result<String> {
    match command {
        Command::Participate {
            experiment,
            alternatives,
            salt,
        } => Ok(service
            .participate_with_salt(&experiment, &alternatives, salt.as_deref())
            .await?),
        Command::Complete { experiment } => {
            Ok(service.complete(&experiment).await?.unwrap_or_default())
        }
        Command::Winner {
            experiment,
            set,
            clear,
        } => {
            if clear {
                service.clear_winner(&experiment).await?;
            } else if let Some(winner) = set {
                service.set_winner(&experiment, &winner).await?;
            }

            Ok(service.winner(&experiment).await?.unwrap_or_default())
        }
        Command::Stats { experiment } => {
            let report = StatisticsReport {
                total_participants: service.get_total_participants(&experiment).await?,
                total_completed: service.get_total_completed(&experiment).await?,
                alternatives: service.get_statistics(&experiment).await?,
                experiment,
            };

            Ok(serde_json::to_string_pretty(&report)?)
        }
        Command::Reset { experiment } => {
            service.reset_experiment(&experiment).await?;
            Ok(String::new())
        }
    }
}
