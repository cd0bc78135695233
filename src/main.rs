use clap::{Arg, ArgAction, Command};
use formpilot::browser::chrome::ChromeDriverFactory;
use formpilot::core::config::Config;
use formpilot::service::AutomationService;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formpilot=info".into()),
        )
        .init();

    let matches = Command::new("formpilot")
        .about("Analyze web forms and report their structure")
        .arg(
            Arg::new("url")
                .help("Page to analyze")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("pool-size")
                .long("pool-size")
                .help("Number of pooled browser sessions")
                .default_value("1"),
        )
        .arg(
            Arg::new("headed")
                .long("headed")
                .help("Run with a visible browser window")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let url = matches
        .get_one::<String>("url")
        .map(String::as_str)
        .unwrap_or_default();
    let pool_size: usize = matches
        .get_one::<String>("pool-size")
        .map(String::as_str)
        .unwrap_or("1")
        .parse()?;

    let mut config = Config::default();
    config.pool.size = pool_size;
    config.browser.headless = !matches.get_flag("headed");

    let factory = ChromeDriverFactory::new(config.browser.clone());
    let service = AutomationService::init(factory, config).await?;

    info!(url, "analyzing page");
    let analysis = service.analyze(url).await?;
    info!(form_count = analysis.form_count, "analysis complete");

    for (index, form) in analysis.forms.iter().enumerate() {
        println!(
            "form {} ({:?}): {} fields, {} required",
            index,
            form.form_type,
            form.fields.len(),
            form.required_fields.len()
        );
        for field in &form.fields {
            println!(
                "  {} [{:?}/{:?}]{}",
                field.name,
                field.kind,
                field.category,
                if field.required { " *" } else { "" }
            );
        }
    }

    service.pool_cleanup().await;
    Ok(())
}
