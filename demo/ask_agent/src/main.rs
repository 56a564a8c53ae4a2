use clap::Parser;
use freethinker_core::telemetry;
use freethinker_core::{Agent, AgentConfig, AgentRequest, StructuredResponse};
use std::collections::HashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "ask_agent")]
#[command(about = "Ask FreeThinker: tool selection → tool → verification → structured answer", long_about = None)]
struct Args {
    /// groq, gemini or mistral (defaults to FREETHINKER_PROVIDER / config)
    #[arg(long)]
    provider: Option<String>,

    /// Any model id offered by the provider
    #[arg(long)]
    model: Option<String>,

    /// Re-fetch and print the provider's model list, then exit
    #[arg(long)]
    refresh_models: bool,

    /// Print the active system prompt, then exit
    #[arg(long)]
    show_prompt: bool,

    /// Print the full structured response as JSON
    #[arg(long)]
    json: bool,

    /// One-shot prompt; omit for an interactive session
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Keys and settings: config/.env first, then ./.env; real env wins
    let _ = dotenvy::from_filename("config/.env");
    let _ = dotenvy::dotenv();

    let _ = telemetry::init_tracing("warn,freethinker_core=warn,ask_agent=info");

    let args = Args::parse();
    let cfg = AgentConfig::load();
    let agent = Agent::from_config(cfg)?;

    if args.show_prompt {
        println!("{}", agent.system_prompt());
        return Ok(());
    }

    let provider = args
        .provider
        .clone()
        .unwrap_or_else(|| agent.config().default_provider.clone());

    if args.refresh_models {
        match agent.refresh_models(&provider, &HashMap::new()).await {
            Ok(models) => {
                for m in models {
                    println!("{}", m);
                }
            }
            Err(e) => {
                error!(target: "ask_agent", provider = %provider, error = %e, "Model refresh failed");
                let fallback = agent.providers().resolve(&provider)?.models().await;
                println!("(refresh failed: {}; defaults follow)", e);
                for m in fallback {
                    println!("{}", m);
                }
            }
        }
        return Ok(());
    }

    let make_request = |prompt: String| {
        let mut req = AgentRequest::new(prompt).with_provider(provider.clone());
        if let Some(m) = &args.model {
            req = req.with_model(m.clone());
        }
        req
    };

    if let Some(prompt) = args.prompt.clone() {
        ask(&agent, make_request(prompt), args.json).await;
        return Ok(());
    }

    info!(target: "ask_agent", provider = %provider, "Interactive session started");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"\nAsk me anything: ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        ask(&agent, make_request(line.to_string()), args.json).await;
    }

    let stats = agent.stats().snapshot();
    info!(
        target: "ask_agent",
        turns = stats.turns,
        tool_calls = stats.tool_calls,
        tool_failures = stats.tool_failures,
        "Session finished"
    );
    Ok(())
}

async fn ask(agent: &Agent, request: AgentRequest, as_json: bool) {
    match agent.run(request).await {
        Ok(response) if as_json => match serde_json::to_string_pretty(&response) {
            Ok(s) => println!("{}", s),
            Err(e) => warn!(target: "ask_agent", error = %e, "Could not serialize response"),
        },
        Ok(response) => print_response(&response),
        Err(e) => println!("\n[turn failed] {}", e),
    }
}

fn print_response(r: &StructuredResponse) {
    println!("\n{}", r.text_answer);
    println!();
    if let Some(tool) = &r.tool_name {
        println!("tool:        {}", tool);
    }
    println!("visual hint: {}", r.visual_hint);
    println!("confidence:  {:.2}", r.verification.confidence);
    if !r.verification.consistency_flags.is_empty() {
        let flags: Vec<&str> = r
            .verification
            .consistency_flags
            .iter()
            .map(String::as_str)
            .collect();
        println!("flags:       {}", flags.join(", "));
    }
    if let Some(hint) = &r.verification.cross_validation_hint {
        println!("note:        {}", hint);
    }
    for url in &r.display.citations {
        println!("source:      {}", url);
    }
    if !r.visual_hint.is_none() {
        if let Ok(display) = serde_json::to_string(&r.display) {
            println!("display:     {}", display);
        }
    }
}
