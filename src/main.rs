use clap::parser::ValueSource;
use clap::{Arg, ArgMatches, Command};
use log::LevelFilter;
use mail_risk_scorer::config::yaml_config::{load_config, write_default_config};
use mail_risk_scorer::config::Config;
use mail_risk_scorer::history::{HistoryEntry, JsonHistoryStore};
use mail_risk_scorer::overrides::{
    JsonOverrideRepository, OverrideError, OverrideList, OverrideRepository, Whitelist,
};
use mail_risk_scorer::{AnalysisResult, Analyzer, EmailData};
use std::fs;
use std::path::Path;
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("mail-risk-scorer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Scores inbound email for phishing and scam risk")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/mail-risk-scorer.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-email")
                .long("test-email")
                .value_name("FILE")
                .help("Analyze an email file (.eml raw message or .json fields)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the analysis result as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("offline")
                .long("offline")
                .help("Skip URL reputation and LLM lookups")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("blacklist-email")
                .long("blacklist-email")
                .value_name("EMAIL")
                .help("Add a sender address to the blacklist")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("blacklist-domain")
                .long("blacklist-domain")
                .value_name("DOMAIN")
                .help("Add a sender domain to the blacklist")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("whitelist-email")
                .long("whitelist-email")
                .value_name("EMAIL")
                .help("Add a sender address to the whitelist")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("whitelist-domain")
                .long("whitelist-domain")
                .value_name("DOMAIN")
                .help("Add a sender domain to the whitelist")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("remove-blacklist")
                .long("remove-blacklist")
                .value_name("ENTRY")
                .help("Remove an email or domain from the blacklist")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("remove-whitelist")
                .long("remove-whitelist")
                .value_name("ENTRY")
                .help("Remove an email or domain from the whitelist")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("show-lists")
                .long("show-lists")
                .help("Show blacklist and whitelist entries")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("history")
                .long("history")
                .help("Show recent analyses")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("clear-history")
                .long("clear-history")
                .help("Delete the analysis history")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        match write_default_config(generate_path) {
            Ok(()) => {
                println!("Default configuration written to: {generate_path}");
                println!("API keys can also be supplied via VIRUSTOTAL_API_KEY and OPENROUTER_API_KEY.");
            }
            Err(e) => {
                eprintln!("Error writing configuration file: {e:#}");
                process::exit(1);
            }
        }
        return;
    }

    let mut config = resolve_config(&matches);

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        config.log_level()
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if matches.get_flag("offline") {
        config.virustotal.enabled = false;
        config.llm.enabled = false;
    }

    let repository = JsonOverrideRepository::new(&config.storage.data_dir);
    let history = JsonHistoryStore::new(&config.storage.data_dir, config.storage.history_limit);

    if let Some(value) = matches.get_one::<String>("blacklist-email") {
        edit_blacklist(&repository, |list| list.add_email(value));
        return;
    }
    if let Some(value) = matches.get_one::<String>("blacklist-domain") {
        edit_blacklist(&repository, |list| list.add_domain(value));
        return;
    }
    if let Some(value) = matches.get_one::<String>("remove-blacklist") {
        edit_blacklist(&repository, |list| list.remove(value));
        return;
    }
    if let Some(value) = matches.get_one::<String>("whitelist-email") {
        edit_whitelist(&repository, |list| list.add_email(value));
        return;
    }
    if let Some(value) = matches.get_one::<String>("whitelist-domain") {
        edit_whitelist(&repository, |list| list.add_domain(value));
        return;
    }
    if let Some(value) = matches.get_one::<String>("remove-whitelist") {
        edit_whitelist(&repository, |list| list.remove(value));
        return;
    }

    if matches.get_flag("show-lists") {
        show_lists(&repository);
        return;
    }

    if matches.get_flag("clear-history") {
        match history.clear() {
            Ok(()) => println!("✅ History cleared"),
            Err(e) => {
                eprintln!("❌ Failed to clear history: {e:#}");
                process::exit(1);
            }
        }
        return;
    }

    if matches.get_flag("history") {
        show_history(&history);
        return;
    }

    if let Some(email_file) = matches.get_one::<String>("test-email") {
        test_email_file(
            &config,
            &repository,
            &history,
            email_file,
            matches.get_flag("json"),
        )
        .await;
        return;
    }

    eprintln!("Nothing to do. Use --test-email FILE or --help for the available commands.");
    process::exit(2);
}

/// An explicitly given config file must load; the default location may be absent.
fn resolve_config(matches: &ArgMatches) -> Config {
    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("/etc/mail-risk-scorer.yaml");
    let explicit = matches.value_source("config") != Some(ValueSource::DefaultValue);

    if explicit || Path::new(config_path).exists() {
        match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading configuration: {e:#}");
                process::exit(1);
            }
        }
    } else {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }
}

fn edit_blacklist<F>(repository: &JsonOverrideRepository, edit: F)
where
    F: FnOnce(&OverrideList) -> Result<OverrideList, OverrideError>,
{
    let current = repository.load_blacklist();
    let next = edit(&current).unwrap_or_else(|e| reject(e));
    if let Err(e) = repository.save_blacklist(&next) {
        eprintln!("❌ Failed to save blacklist: {e:#}");
        process::exit(1);
    }
    println!(
        "✅ blacklist updated ({} entries)",
        next.emails().len() + next.domains().len()
    );
}

fn edit_whitelist<F>(repository: &JsonOverrideRepository, edit: F)
where
    F: FnOnce(&OverrideList) -> Result<OverrideList, OverrideError>,
{
    let current = repository.load_whitelist();
    let next = Whitelist::new(edit(current.user_entries()).unwrap_or_else(|e| reject(e)));
    if let Err(e) = repository.save_whitelist(&next) {
        eprintln!("❌ Failed to save whitelist: {e:#}");
        process::exit(1);
    }
    let entries = next.user_entries();
    println!(
        "✅ whitelist updated ({} entries)",
        entries.emails().len() + entries.domains().len()
    );
}

fn reject(error: OverrideError) -> ! {
    eprintln!("❌ {error}");
    process::exit(1);
}

fn print_list(title: &str, list: &OverrideList) {
    println!("{title}");
    if list.is_empty() {
        println!("  (empty)");
        return;
    }
    for email in list.emails() {
        println!("  ✉️  {email}");
    }
    for domain in list.domains() {
        println!("  🌐 {domain}");
    }
}

fn show_lists(repository: &JsonOverrideRepository) {
    print_list("🚫 Blacklist", &repository.load_blacklist());
    println!();
    print_list("✅ Whitelist", repository.load_whitelist().user_entries());
}

fn show_history(history: &JsonHistoryStore) {
    let entries = history.load();
    if entries.is_empty() {
        println!("📭 No analyses recorded yet");
        return;
    }

    println!("📜 Recent analyses");
    println!("═══════════════════════════════════════");
    for entry in entries {
        println!(
            "{} {} {:>3} {:<10} {} | {}",
            entry.verdict.icon(),
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.score,
            entry.verdict.level(),
            truncate_string(&entry.sender, 40),
            truncate_string(&entry.subject, 60)
        );
    }
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

fn parse_email_file(email_file: &str) -> EmailData {
    let content = match fs::read_to_string(email_file) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("❌ Error reading email file: {}", e);
            process::exit(1);
        }
    };

    let is_json = Path::new(email_file)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        match EmailData::from_json(&content) {
            Ok(email) => email,
            Err(e) => {
                eprintln!("❌ Error parsing email JSON: {e:#}");
                process::exit(1);
            }
        }
    } else {
        EmailData::from_raw(&content)
    }
}

async fn test_email_file(
    config: &Config,
    repository: &JsonOverrideRepository,
    history: &JsonHistoryStore,
    email_file: &str,
    as_json: bool,
) {
    let email = parse_email_file(email_file);

    let analyzer = match Analyzer::from_config(
        config,
        repository.load_blacklist(),
        repository.load_whitelist(),
    ) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            eprintln!("❌ Failed to initialize analyzer: {e:#}");
            process::exit(1);
        }
    };

    let result = analyzer.analyze(&email).await;

    if let Err(e) = history.record(HistoryEntry::from_result(&email, &result)) {
        log::warn!("Could not record history: {:#}", e);
    }

    if as_json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("❌ Failed to serialize result: {e}");
                process::exit(1);
            }
        }
    } else {
        print_report(email_file, &email, &result);
    }
}

fn print_report(email_file: &str, email: &EmailData, result: &AnalysisResult) {
    println!("🧪 Testing email file: {}", email_file);
    println!("  From:    {}", email.from);
    println!("  Subject: {}", email.subject.as_deref().unwrap_or("(No subject)"));
    println!();
    println!(
        "{} {} ({}/100)",
        result.verdict.icon(),
        result.verdict.level(),
        result.score
    );
    println!("  {}", result.verdict.description());
    if result.whitelisted {
        if result.breakdown.damped {
            println!("  Sender is whitelisted; heuristic signals were damped");
        } else {
            println!("  Sender is whitelisted, but scam content overrides the whitelist");
        }
    }
    println!();

    if result.signals.is_empty() {
        println!("No risk signals found.");
    } else {
        let mut signals: Vec<_> = result.signals.iter().collect();
        signals.sort_by_key(|s| s.severity().display_rank());

        println!("Signals:");
        for signal in signals {
            println!(
                "  [{:<6}] {:>+4}  {}: {}",
                signal.severity().as_str().to_uppercase(),
                signal.score(),
                signal.name(),
                signal.description()
            );
        }
    }

    println!();
    println!(
        "URL reputation: {}  |  AI analysis: {}",
        if result.url_reputation_enabled { "checked" } else { "not used" },
        if result.llm_enabled { "checked" } else { "not used" }
    );
}
