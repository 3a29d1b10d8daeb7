//! Interface de linha de comando do qupods baseada em clap.
//!
//! Todos os parâmetros ajustáveis são opcionais aqui: flags ausentes caem
//! para o `qupods.toml` e depois para os defaults internos (ver [`crate::config`]).

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// Submete um pod por item a partir de um template, poucos de cada vez, e arquiva seus logs.
#[derive(Debug, Parser)]
#[command(name = "qupods", version, about, arg_required_else_help = true)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["items", "json", "braces"])
))]
pub struct Cli {
    /// Template do manifesto do pod; pode usar {{ index }}, {{ item }} e {{ values.CHAVE }}.
    pub template: PathBuf,

    /// Habilita saída detalhada (debug).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Imprime cada manifesto antes de submetê-lo.
    #[arg(short = 'P', long, default_value_t = false)]
    pub print_specs: bool,

    /// Prefixo do comando do cluster [default: microk8s kubectl].
    #[arg(long)]
    pub kubectl: Option<String>,

    /// Diretório de arquivo para logs de pods finalizados; vazio desativa o arquivamento [default: ./QUPODS].
    #[arg(long)]
    pub logdir: Option<String>,

    /// Não espera a conclusão depois de submeter todos os jobs.
    #[arg(long, default_value_t = false)]
    pub nowait: bool,

    /// Intervalo de consulta em segundos [default: 3.0].
    #[arg(long)]
    pub poll: Option<f64>,

    /// Pausa após cada submissão, em segundos [default: 1.0].
    #[arg(long)]
    pub pace: Option<f64>,

    /// Máximo de jobs em execução mais pendentes [default: 100000].
    #[arg(long = "maxrunning")]
    pub max_running: Option<usize>,

    /// Máximo de jobs pendentes [default: 3].
    #[arg(long = "maxpending")]
    pub max_pending: Option<usize>,

    /// Itens como linhas de texto em um arquivo.
    #[arg(short, long)]
    pub items: Option<PathBuf>,

    /// Itens como uma lista JSON de mapas de strings.
    #[arg(short, long)]
    pub json: Option<PathBuf>,

    /// Itens por expansão de chaves, ex.: 'job-{000..099}'.
    #[arg(short, long)]
    pub braces: Option<String>,

    /// Arquivo de configuração [default: ./qupods.toml quando existir].
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Mostra uma barra de progresso em vez de linhas de status por item.
    #[arg(long, default_value_t = false)]
    pub progress: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parses_template_and_source() {
        let cli = Cli::parse_from(["qupods", "pod.yaml", "-i", "items.txt"]);
        assert_eq!(cli.template, PathBuf::from("pod.yaml"));
        assert_eq!(cli.items, Some(PathBuf::from("items.txt")));
        assert!(cli.json.is_none());
        assert!(!cli.nowait);
        assert!(cli.poll.is_none());
    }

    #[test]
    fn cli_parses_tunables() {
        let cli = Cli::parse_from([
            "qupods",
            "-v",
            "-P",
            "--kubectl",
            "kubectl --context lab",
            "--logdir",
            "out",
            "--nowait",
            "--poll",
            "0.5",
            "--pace",
            "0",
            "--maxrunning",
            "20",
            "--maxpending",
            "2",
            "--braces",
            "j-{1..3}",
            "pod.yaml",
        ]);
        assert!(cli.verbose);
        assert!(cli.print_specs);
        assert_eq!(cli.kubectl.as_deref(), Some("kubectl --context lab"));
        assert_eq!(cli.logdir.as_deref(), Some("out"));
        assert!(cli.nowait);
        assert_eq!(cli.poll, Some(0.5));
        assert_eq!(cli.pace, Some(0.0));
        assert_eq!(cli.max_running, Some(20));
        assert_eq!(cli.max_pending, Some(2));
        assert_eq!(cli.braces.as_deref(), Some("j-{1..3}"));
    }

    #[test]
    fn cli_rejects_two_sources() {
        let err = Cli::try_parse_from(["qupods", "pod.yaml", "-i", "a", "-j", "b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn cli_requires_a_source() {
        let err = Cli::try_parse_from(["qupods", "pod.yaml"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
