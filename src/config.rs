//! Configuração do qupods carregada a partir de `qupods.toml`.
//!
//! A struct [`QupodsConfig`] contém os defaults do arquivo; todo campo é
//! opcional. A variável de ambiente `QUPODS_KUBECTL` tem precedência sobre o
//! arquivo para o comando do cluster, e as flags da CLI têm precedência sobre
//! ambos quando as [`Settings`] são resolvidas.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::admission::CapacityLimits;
use crate::cli::Cli;
use crate::error::{QupodsError, Result};
use crate::items::ItemSource;
use crate::state_machine::RetryConfig;

const DEFAULT_CONFIG_FILE: &str = "qupods.toml";
const KUBECTL_ENV: &str = "QUPODS_KUBECTL";

/// Configuração de nível superior carregada de `qupods.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct QupodsConfig {
    /// Prefixo do comando do cluster.
    #[serde(default = "default_kubectl")]
    pub kubectl: String,

    /// Diretório de arquivo; vazio desativa o arquivamento.
    #[serde(default = "default_logdir")]
    pub logdir: String,

    /// Intervalo de consulta em segundos.
    #[serde(default = "default_poll")]
    pub poll: f64,

    /// Pausa após cada submissão, em segundos.
    #[serde(default = "default_pace")]
    pub pace: f64,

    #[serde(default = "default_max_running")]
    pub max_running: usize,

    #[serde(default = "default_max_pending")]
    pub max_pending: usize,

    /// Backoff para remover pods arquivados.
    #[serde(default)]
    pub delete_retry: RetryConfig,
}

fn default_kubectl() -> String {
    "microk8s kubectl".to_string()
}

fn default_logdir() -> String {
    "./QUPODS".to_string()
}

fn default_poll() -> f64 {
    3.0
}

fn default_pace() -> f64 {
    1.0
}

fn default_max_running() -> usize {
    100_000
}

fn default_max_pending() -> usize {
    3
}

impl Default for QupodsConfig {
    fn default() -> Self {
        Self {
            kubectl: default_kubectl(),
            logdir: default_logdir(),
            poll: default_poll(),
            pace: default_pace(),
            max_running: default_max_running(),
            max_pending: default_max_pending(),
            delete_retry: RetryConfig::default(),
        }
    }
}

impl QupodsConfig {
    /// Carrega `path`, ou `qupods.toml` no diretório atual quando nenhum caminho é dado.
    /// Arquivo padrão ausente significa defaults internos; arquivo explícito ausente é erro.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::read(path)?
                } else {
                    Self::default()
                }
            }
        };

        // Variável de ambiente tem precedência sobre o arquivo.
        if let Ok(kubectl) = std::env::var(KUBECTL_ENV) {
            if !kubectl.trim().is_empty() {
                config.kubectl = kubectl;
            }
        }

        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| QupodsError::io(path, e))?;
        Ok(toml::from_str::<QupodsConfig>(&contents)?)
    }
}

/// Tudo que uma execução precisa, após mesclar as flags sobre o arquivo.
#[derive(Debug, Clone)]
pub struct Settings {
    pub template: PathBuf,
    pub source: ItemSource,
    pub kubectl: String,
    /// `None` desativa o arquivamento.
    pub logdir: Option<PathBuf>,
    pub poll: Duration,
    pub pace: Duration,
    pub limits: CapacityLimits,
    pub wait_for_completion: bool,
    pub print_specs: bool,
    pub progress: bool,
    pub delete_retry: RetryConfig,
}

impl Settings {
    pub fn resolve(cli: Cli, config: QupodsConfig) -> Result<Self> {
        let source = ItemSource::select(cli.items, cli.json, cli.braces)?;

        let kubectl = cli.kubectl.unwrap_or(config.kubectl);
        if kubectl.trim().is_empty() {
            return Err(QupodsError::Config("cluster command is empty".into()));
        }

        let logdir = cli.logdir.unwrap_or(config.logdir);
        let logdir = (!logdir.is_empty()).then(|| PathBuf::from(logdir));

        Ok(Self {
            template: cli.template,
            source,
            kubectl,
            logdir,
            poll: seconds("poll", cli.poll.unwrap_or(config.poll))?,
            pace: seconds("pace", cli.pace.unwrap_or(config.pace))?,
            limits: CapacityLimits {
                max_pending: cli.max_pending.unwrap_or(config.max_pending),
                max_running: cli.max_running.unwrap_or(config.max_running),
            },
            wait_for_completion: !cli.nowait,
            print_specs: cli.print_specs,
            progress: cli.progress,
            delete_retry: config.delete_retry,
        })
    }
}

fn seconds(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|e| {
        QupodsError::Config(format!("--{name} must be a non-negative number of seconds: {e}"))
    })
}
