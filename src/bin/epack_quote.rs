use std::{fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use epack_api::{
    config::PricingConfig,
    services::pricing::{
        film::FilmCostInput,
        materials::FilmLayer,
        unified::{DeliveryLocation, PrintingMethod, QuoteRequest, Urgency},
        PricingService,
    },
};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "epack-quote", about = "Offline pouch and film pricing", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "KRW to JPY exchange rate; defaults to the built-in rate"
    )]
    exchange_rate: Option<Decimal>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unified quote for a pouch or roll film
    Quote(QuoteArgs),
    /// Layer-by-layer film cost
    Film(FilmArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum PrintingArg {
    Digital,
    Gravure,
}

impl From<PrintingArg> for PrintingMethod {
    fn from(value: PrintingArg) -> Self {
        match value {
            PrintingArg::Digital => PrintingMethod::Digital,
            PrintingArg::Gravure => PrintingMethod::Gravure,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum UrgencyArg {
    Standard,
    Express,
}

impl From<UrgencyArg> for Urgency {
    fn from(value: UrgencyArg) -> Self {
        match value {
            UrgencyArg::Standard => Urgency::Standard,
            UrgencyArg::Express => Urgency::Express,
        }
    }
}

#[derive(Args)]
struct QuoteArgs {
    #[arg(long, help = "Read the full request from a JSON file instead of flags")]
    request: Option<PathBuf>,
    #[arg(long, default_value = "flat_3_side")]
    bag_type: String,
    #[arg(long, default_value = "PET")]
    material: String,
    #[arg(long, help = "Width in mm")]
    width: Option<Decimal>,
    #[arg(long, default_value = "0", help = "Height in mm")]
    height: Decimal,
    #[arg(long, default_value = "0", help = "Gusset depth in mm")]
    depth: Decimal,
    #[arg(long, default_value_t = 1000)]
    quantity: u32,
    #[arg(long, value_delimiter = ',', help = "Per-SKU quantities, e.g. 500,500,1000")]
    sku_quantities: Option<Vec<u32>>,
    #[arg(long, value_enum, default_value = "digital")]
    printing: PrintingArg,
    #[arg(long)]
    colors: Option<u8>,
    #[arg(long, action = ArgAction::SetTrue)]
    double_sided: bool,
    #[arg(long, value_enum, default_value = "standard")]
    urgency: UrgencyArg,
    #[arg(long, action = ArgAction::SetTrue)]
    international: bool,
    #[arg(long, value_delimiter = ',', help = "Post-processing options, e.g. zipper,notch")]
    post_processing: Vec<String>,
}

#[derive(Args)]
struct FilmArgs {
    #[arg(
        long,
        value_delimiter = ',',
        required = true,
        help = "Layers as MATERIAL:MICRONS, e.g. PET:12,AL:7,LLDPE:60"
    )]
    layers: Vec<String>,
    #[arg(long, help = "Product width in mm")]
    width: Decimal,
    #[arg(long, help = "Delivered length in metres")]
    length: Decimal,
    #[arg(long)]
    loss_rate: Option<Decimal>,
    #[arg(long, action = ArgAction::SetTrue)]
    no_printing: bool,
    #[arg(long, help = "Raw material roll width in mm")]
    material_width: Option<Decimal>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = PricingConfig::default();
    if let Some(rate) = cli.exchange_rate {
        config.exchange_rate_krw_jpy = rate;
    }
    let service = PricingService::new(config);

    match cli.command {
        Commands::Quote(args) => {
            let request = quote_request(args)?;
            let quote = service
                .calculate_quote(&request)
                .map_err(|e| anyhow!("quote failed: {}", e))?;
            print_json(&quote)
        }
        Commands::Film(args) => {
            let input = film_input(args)?;
            let cost = service
                .calculate_film_cost(&input)
                .map_err(|e| anyhow!("film cost failed: {}", e))?;
            print_json(&cost)
        }
    }
}

fn quote_request(args: QuoteArgs) -> Result<QuoteRequest> {
    if let Some(path) = args.request {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a valid quote request", path.display()));
    }

    let width = args
        .width
        .ok_or_else(|| anyhow!("--width is required unless --request is given"))?;
    let mut request = QuoteRequest::new(
        args.bag_type,
        args.material,
        width,
        args.height,
        args.quantity,
    );
    request.depth = args.depth;
    request.sku_quantities = args.sku_quantities;
    request.use_sku_calculation = request.sku_quantities.is_some();
    request.printing_type = args.printing.into();
    request.printing_colors = args.colors;
    request.double_sided = args.double_sided;
    request.urgency = args.urgency.into();
    request.post_processing_options = args.post_processing;
    if args.international {
        request.delivery_location = DeliveryLocation::International;
    }
    Ok(request)
}

fn parse_layer(raw: &str) -> Result<FilmLayer> {
    let (material, thickness) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("layer '{}' must look like MATERIAL:MICRONS", raw))?;
    let thickness: u32 = thickness
        .trim()
        .parse()
        .with_context(|| format!("invalid thickness in layer '{}'", raw))?;
    Ok(FilmLayer::new(material.trim(), thickness))
}

fn film_input(args: FilmArgs) -> Result<FilmCostInput> {
    let layers = args
        .layers
        .iter()
        .map(|raw| parse_layer(raw))
        .collect::<Result<Vec<_>>>()?;
    let mut input = FilmCostInput::new(layers, args.length);
    input.width = args.width;
    input.loss_rate = args.loss_rate;
    input.has_printing = !args.no_printing;
    input.material_width = args.material_width;
    Ok(input)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
