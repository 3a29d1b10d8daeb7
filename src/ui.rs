//! Saída de terminal do qupods: progresso por item e resumo final.
//!
//! O progresso vai para o `tracing` como linhas de status ou, com
//! `--progress`, para uma barra do `indicatif`. O resumo usa `console`
//! para estilização com cores.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::reconciler::PhaseCounters;
use crate::state_machine::RunSummary;

/// Progresso de submissão de uma execução.
pub struct RunProgress {
    total: usize,
    bar: Option<ProgressBar>,
}

impl RunProgress {
    pub fn new(total: usize, show_bar: bool) -> Self {
        let bar = show_bar.then(|| {
            let pb = ProgressBar::new(total as u64);
            // Template constante; se for rejeitado, fica o estilo padrão.
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb
        });
        Self { total, bar }
    }

    /// Reporta os contadores observados antes de considerar o item `index`.
    pub fn item(&self, index: usize, counters: &PhaseCounters) {
        match &self.bar {
            Some(pb) => {
                pb.set_position(index as u64);
                pb.set_message(counters.to_string());
            }
            None => info!("{} {counters}", fraction(index, self.total)),
        }
    }

    /// Reporta os contadores enquanto espera a conclusão.
    pub fn waiting(&self, counters: &PhaseCounters) {
        match &self.bar {
            Some(pb) => {
                pb.set_position(self.total as u64);
                pb.set_message(format!("waiting {counters}"));
            }
            None => info!("waiting {counters}"),
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.bar {
            pb.finish_and_clear();
        }
    }
}

/// `index/total` com preenchimento, como `     3/10    `.
pub fn fraction(index: usize, total: usize) -> String {
    format!("{index:6}/{total:<6}")
}

/// Exibe o resumo da execução como JSON estilizado.
pub fn print_summary(summary: &RunSummary) {
    let (style, headline) = if summary.is_clean() {
        (Style::new().green().bold(), "✓ Execução concluída")
    } else {
        (Style::new().red().bold(), "✗ Execução concluída com itens falhos")
    };
    println!();
    println!("{}", style.apply_to(format!("─── {headline} ───")));
    println!(
        "{}",
        serde_json::to_string_pretty(summary).unwrap_or_default()
    );
    let yellow = Style::new().yellow();
    for failure in &summary.failures {
        println!(
            "  {} item {} {}: {}",
            yellow.apply_to("↳"),
            failure.index,
            failure.name,
            failure.reason
        );
    }
}
