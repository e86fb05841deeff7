//! Command line and environment configuration

use clap::Parser;

use jobsync_common::Error;

/// Default port for the health probe server
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// jobsync - copy Deployment images onto annotated CronJobs
#[derive(Parser, Debug, Clone)]
#[command(name = "jobsync", version, about, long_about = None)]
pub struct Cli {
    /// Watch only this namespace (required)
    #[arg(long, env = "JOBSYNC_NAMESPACE", default_value = "")]
    pub namespace: String,

    /// Log intended CronJob updates without writing them
    #[arg(long, env = "JOBSYNC_DRY_RUN")]
    pub dry_run: bool,

    /// Use the local kubeconfig instead of in-cluster credentials
    #[arg(long, env = "JOBSYNC_RUN_OUTSIDE_CLUSTER")]
    pub run_outside_cluster: bool,

    /// Port for the /healthz and /readyz endpoints
    #[arg(long, env = "JOBSYNC_HEALTH_PORT", default_value_t = DEFAULT_HEALTH_PORT)]
    pub health_port: u16,
}

/// Validated operator settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Namespace whose Deployments and CronJobs are synced
    pub namespace: String,
    /// Suppress CronJob writes
    pub dry_run: bool,
    /// Load credentials from the kubeconfig rather than the service account
    pub run_outside_cluster: bool,
    /// Health probe port
    pub health_port: u16,
}

impl TryFrom<Cli> for OperatorConfig {
    type Error = Error;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let namespace = cli.namespace.trim();
        if namespace.is_empty() {
            return Err(Error::config(
                "namespace is not defined or empty, set --namespace or JOBSYNC_NAMESPACE",
            ));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            dry_run: cli.dry_run,
            run_outside_cluster: cli.run_outside_cluster,
            health_port: cli.health_port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("jobsync").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_parse_into_config() {
        let cli = parse(&["--namespace", "batch", "--dry-run", "--run-outside-cluster"]);
        let config = OperatorConfig::try_from(cli).unwrap();

        assert_eq!(
            config,
            OperatorConfig {
                namespace: "batch".to_string(),
                dry_run: true,
                run_outside_cluster: true,
                health_port: DEFAULT_HEALTH_PORT,
            }
        );
    }

    #[test]
    fn defaults_are_off() {
        let config = OperatorConfig::try_from(parse(&["--namespace", "batch"])).unwrap();
        assert!(!config.dry_run);
        assert!(!config.run_outside_cluster);
    }

    #[test]
    fn custom_health_port() {
        let cli = parse(&["--namespace", "batch", "--health-port", "9090"]);
        assert_eq!(OperatorConfig::try_from(cli).unwrap().health_port, 9090);
    }

    #[test]
    fn empty_namespace_is_rejected() {
        let cli = Cli {
            namespace: "  ".to_string(),
            dry_run: false,
            run_outside_cluster: false,
            health_port: DEFAULT_HEALTH_PORT,
        };
        let err = OperatorConfig::try_from(cli).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn namespace_is_trimmed() {
        let cli = Cli {
            namespace: " batch ".to_string(),
            dry_run: false,
            run_outside_cluster: false,
            health_port: DEFAULT_HEALTH_PORT,
        };
        assert_eq!(OperatorConfig::try_from(cli).unwrap().namespace, "batch");
    }
}
