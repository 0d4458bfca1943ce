// Standalone check of credentials and model access, outside the HTTP server.
//
// Usage: access-check [region]

use std::sync::Arc;

use foundation_proxy::bedrock::{BedrockClient, UpstreamClient, TOKEN_ENV};
use foundation_proxy::config::load_config;
use foundation_proxy::error::classify;
use foundation_proxy::invoke::{
    image_dispatcher, text_dispatcher, GenerationRequest, CLAUDE_TEXT_MODEL_ID, SDXL_MODEL_ID,
};

struct CheckResult {
    name: &'static str,
    passed: bool,
    details: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    foundation_proxy::init_tracing(&config.log_level);

    let region = std::env::args().nth(1).unwrap_or_else(|| config.region.clone());
    println!("Checking model service access in region {}", region);

    let mut results = Vec::new();

    let client = BedrockClient::from_config(&config.upstream, &region);
    if !client.has_credentials() {
        results.push(CheckResult {
            name: "credentials",
            passed: false,
            details: format!("{} is not set", TOKEN_ENV),
        });
        return report(&results);
    }
    results.push(CheckResult {
        name: "credentials",
        passed: true,
        details: format!("bearer token found for {}", client.region()),
    });
    let client: Arc<dyn UpstreamClient> = Arc::new(client);

    results.push(match client.list_foundation_models().await {
        Ok(models) => CheckResult {
            name: "list foundation models",
            passed: true,
            details: format!("{} models visible", models.len()),
        },
        Err(e) => CheckResult {
            name: "list foundation models",
            passed: false,
            details: e.to_string(),
        },
    });

    let request = GenerationRequest::new("Hello! Please respond with a brief greeting.")
        .temperature(0.5)
        .max_tokens(100);
    results.push(
        match text_dispatcher(Arc::clone(&client)).invoke(CLAUDE_TEXT_MODEL_ID, &request).await {
            Ok(result) => CheckResult {
                name: "text model invoke",
                passed: true,
                details: result.into_text().unwrap_or_default().trim().to_string(),
            },
            Err(e) => CheckResult {
                name: "text model invoke",
                passed: false,
                details: classify(&e).detail,
            },
        },
    );

    let request = GenerationRequest::new("A simple red circle on a white background");
    results.push(match image_dispatcher(client).invoke(SDXL_MODEL_ID, &request).await {
        Ok(result) => CheckResult {
            name: "image model invoke",
            passed: true,
            details: format!("{} base64 chars", result.into_image().map(|i| i.len()).unwrap_or(0)),
        },
        Err(e) => CheckResult {
            name: "image model invoke",
            passed: false,
            details: classify(&e).detail,
        },
    });

    report(&results)
}

fn report(results: &[CheckResult]) -> anyhow::Result<()> {
    println!();
    for result in results {
        let mark = if result.passed { "PASS" } else { "FAIL" };
        println!("[{}] {}: {}", mark, result.name, result.details);
    }

    let failed = results.iter().filter(|r| !r.passed).count();
    println!("\n{} of {} checks passed", results.len() - failed, results.len());
    if failed > 0 {
        anyhow::bail!("{} access check(s) failed", failed);
    }
    Ok(())
}
