use undertone::{AnalysisResult, category_for_context};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_report(result: &AnalysisResult, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Analyzing: \"{}\"", result.text), ansi::CYAN)));
    if result.budget.truncated {
        println!("{}", palette.paint("  (input clamped to the character budget)", ansi::YELLOW));
    }

    println!("\n{}", palette.paint("━━━ Context ━━━", ansi::GRAY));
    print_context(result, &palette);

    println!("\n{}", palette.paint("━━━ Signals ━━━", ansi::GRAY));
    print_signals(result, &palette);

    println!("\n{}", palette.paint("━━━ Entities & Edges ━━━", ansi::GRAY));
    if result.entities.is_empty() && result.phrase_edges.is_empty() {
        println!("{}", palette.dim("  none"));
    }
    for ent in &result.entities {
        println!(
            "  {} {} {}",
            palette.paint(format!("{:?}", ent.kind), ansi::BLUE),
            palette.bold(&ent.text),
            palette.paint(format!("span {}..{}", ent.start, ent.end), ansi::YELLOW),
        );
    }
    for edge in &result.phrase_edges {
        println!(
            "  {} {} {} {}",
            palette.paint(&edge.edge, ansi::CYAN),
            palette.dim(format!("({})", edge.category)),
            palette.bold(&edge.matched),
            palette.paint(format!("span {}..{}", edge.start, edge.end), ansi::YELLOW),
        );
    }

    println!("\n{}", palette.paint("━━━ Taxonomy ━━━", ansi::GRAY));
    if result.taxonomy.scores.is_empty() {
        println!("{}", palette.dim("  No code reached the threshold"));
    }
    for score in &result.taxonomy.scores {
        println!(
            "  {} {} {} {}",
            palette.bold(palette.paint(&score.code, ansi::GREEN)),
            score.label,
            palette.dim("│"),
            palette.paint(format!("{:.2}", score.score), ansi::YELLOW),
        );
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    let stages: Vec<String> =
        result.timing.stages.iter().map(|s| format!("{} {}µs", s.stage, s.micros)).collect();
    println!(
        "  Total: {}  │  {}",
        palette.paint(format!("{}µs", result.timing.total_micros), ansi::GREEN),
        palette.dim(stages.join("  ")),
    );
    if !result.budget.skipped.is_empty() {
        println!("  {} {}", palette.paint("skipped:", ansi::RED), result.budget.skipped.join(", "));
    }
    println!();
}

fn print_context(result: &AnalysisResult, palette: &ansi::Palette) {
    for (idx, ctx) in result.context.ranked.iter().enumerate() {
        println!(
            "  {} {} {} {} {}",
            palette.paint(format!("[{idx}]"), ansi::GRAY),
            palette.bold(palette.paint(&ctx.id, ansi::GREEN)),
            palette.dim(format!("({})", category_for_context(&ctx.id))),
            palette.paint(format!("score {:.3}", ctx.score), ansi::YELLOW),
            palette.paint(format!("conf {:.3}", ctx.confidence), ansi::CYAN),
        );
        if !ctx.matched_patterns.is_empty() {
            println!("      {} {}", palette.dim("matched:"), ctx.matched_patterns.join(", "));
        }
    }
    let buckets = &result.context.buckets;
    println!(
        "  {} clear {:.2}  caution {:.2}  alert {:.2}  {} {}",
        palette.dim("buckets:"),
        buckets.clear,
        buckets.caution,
        buckets.alert,
        palette.dim("│ tone:"),
        palette.paint(result.context.tone.map_or("-", |b| b.as_str()), ansi::BLUE),
    );
    if !result.context.tripped_guards.is_empty() {
        println!("  {} {}", palette.dim("guards:"), result.context.tripped_guards.join(", "));
    }
}

fn print_signals(result: &AnalysisResult, palette: &ansi::Palette) {
    let flag = |on: bool| if on { palette.paint("yes", ansi::GREEN) } else { palette.dim("no") };

    println!("  {} {}", palette.paint("negation:", ansi::BLUE), flag(result.negation.present));
    for occ in &result.negation.occurrences {
        println!(
            "    {} {} {} {}",
            palette.bold(&occ.trigger),
            palette.dim(format!("{:?}", occ.kind)),
            palette.dim("→"),
            palette.paint(&occ.scope, ansi::YELLOW),
        );
    }
    println!(
        "  {} {} {}",
        palette.paint("sarcasm:", ansi::BLUE),
        flag(result.sarcasm.has_sarcasm),
        palette.dim(format!("score {:.2}", result.sarcasm.sarcasm_score)),
    );
    for signal in &result.sarcasm.signals {
        let detail = format!("{:?} {:.2}", signal.kind, signal.confidence);
        println!("    {} {}", palette.bold(&signal.pattern), palette.dim(detail));
    }
    println!(
        "  {} {} {}",
        palette.paint("intensity:", ansi::BLUE),
        palette.paint(format!("{:.2}", result.intensity.overall_intensity), ansi::YELLOW),
        palette.dim(result.intensity.dominant_level.map(|l| format!("{l:?}")).unwrap_or_default()),
    );
}
