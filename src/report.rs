use querulus::{ExpandedQuery, RequestContext};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
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

pub fn print_rewrite(input: &str, query: &ExpandedQuery, ctx: &RequestContext, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Rewriting: \"{input}\""), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Query ━━━", ansi::GRAY));
    println!("  {}", palette.bold(palette.paint(query.user_query.to_string(), ansi::GREEN)));

    if !query.boost_up.is_empty() || !query.boost_down.is_empty() || !query.filter_queries.is_empty() {
        println!("\n{}", palette.paint("━━━ Fragments ━━━", ansi::GRAY));
        for boost in &query.boost_up {
            println!(
                "  {} {}  {}",
                palette.paint("UP", ansi::GREEN),
                palette.paint(format!("({})", boost.boost), ansi::YELLOW),
                boost.query
            );
        }
        for boost in &query.boost_down {
            println!(
                "  {} {}  {}",
                palette.paint("DOWN", ansi::YELLOW),
                palette.paint(format!("({})", boost.boost), ansi::YELLOW),
                boost.query
            );
        }
        for filter in &query.filter_queries {
            println!("  {} {}", palette.paint("FILTER", ansi::CYAN), filter);
        }
    }

    println!("\n{}", palette.paint("━━━ Applied rules ━━━", ansi::GRAY));
    if ctx.applied_rules.is_empty() {
        println!("{}", palette.dim("  No rules fired"));
    } else {
        for (idx, rule) in ctx.applied_rules.iter().enumerate() {
            println!("  {} {}", palette.paint(format!("[{idx}]"), ansi::GRAY), palette.paint(rule, ansi::CYAN));
        }
    }

    if !ctx.decorations.is_empty() {
        println!("\n{}", palette.paint("━━━ Decorations ━━━", ansi::GRAY));
        for tag in &ctx.decorations {
            println!("  {}", palette.paint(tag, ansi::YELLOW));
        }
    }

    if ctx.debug_enabled {
        println!("\n{}", palette.paint("━━━ Debug ━━━", ansi::GRAY));
        if ctx.debug_log.is_empty() {
            println!("{}", palette.dim("  No actions applied"));
        } else {
            for entry in &ctx.debug_log {
                println!("  {}", palette.dim(entry));
            }
        }
    }
    println!();
}
