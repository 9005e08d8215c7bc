//! # Fatura CLI
//!
//! Usage:
//!   fatura order.json -o invoice.pdf
//!   echo '{ ... }' | fatura -o invoice.pdf
//!   fatura order.json --send --config fatura.json
//!   fatura order.json --preset emerald
//!   fatura --example > order.json

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use fatura::config::AppConfig;
use fatura::dispatch::telegram::TelegramTransport;
use fatura::dispatch::ArtifactDispatcher;
use fatura::error::{DispatchError, FaturaError};
use fatura::model::Order;
use fatura::InvoicePipeline;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fatura=info")))
        .init();

    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_order_json());
        return;
    }

    if let Err(e) = run(&args) {
        eprintln!("✗ {e}");
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<(), FaturaError> {
    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1])?
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    };

    let output_path = flag_value(args, "-o").unwrap_or("invoice.pdf");
    let send = args.iter().any(|a| a == "--send");

    let mut config = AppConfig::load(flag_value(args, "--config").map(Path::new))?;
    if let Some(preset) = flag_value(args, "--preset") {
        config.style = preset.to_string();
    }

    let order = Order::from_json(&input)?;
    let pipeline = InvoicePipeline::from_config(&config)?;
    let prepared = pipeline.prepare(&order)?;

    fs::write(output_path, &prepared.document.bytes)?;
    eprintln!(
        "✓ Written {} bytes to {}",
        prepared.document.bytes.len(),
        output_path
    );

    if send {
        let transport = TelegramTransport::new(config.telegram()?)
            .map_err(DispatchError::Message)?;
        let dispatcher = ArtifactDispatcher::new(transport);
        prepared.dispatch(&dispatcher).into_result()?;
        eprintln!("✓ Summary and invoice delivered");
    } else {
        prepared.into_document();
    }

    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn example_order_json() -> &'static str {
    r##"{
  "customer": {
    "name": "أحمد علي",
    "phone": "07701234567",
    "location": { "lat": 33.3152, "lng": 44.3661 }
  },
  "items": {
    "حليب كامل الدسم": { "price": 1500, "quantity": 2 },
    "خبز عربي": { "price": 500, "quantity": 4 },
    "Pepsi 1L": { "price": 1000, "quantity": 3 }
  },
  "photoLink": "https://example.com/orders/1042.jpg",
  "createdAt": "2026-03-14T18:30:00+03:00"
}
"##
}
