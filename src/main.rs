use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};
use tokio::signal;

use vent_matter_bridge::actuator::SimulatedVent;
use vent_matter_bridge::bridge::{BridgeConfig, Callbacks, VentBridge};
use vent_matter_bridge::config::{Config, load_dotenv};
use vent_matter_bridge::error::{BridgeError, Result};
use vent_matter_bridge::identity::{Eui64, FixedIdentity, HardwareIdentity, InterfaceIdentity};
use vent_matter_bridge::matter::{
    MatterPlatform, RsMatterPlatform, SimulatedPlatform, detect_interface,
};

/// Identity used by `--simulate` when the host has no usable interface.
const SIMULATED_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x0F, 0x00];

#[derive(Parser)]
#[command(name = "vent-matter-bridge")]
#[command(about = "Matter window-covering bridge for a motorized HVAC vent")]
struct Cli {
    /// Run against the in-process simulated stack instead of rs-matter
    #[arg(long)]
    simulate: bool,

    /// Network interface to bind and read the hardware address from
    #[arg(long, env = "MATTER_INTERFACE")]
    interface: Option<String>,

    /// Print pairing information as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Clear all fabrics once the stack is running
    #[arg(long)]
    factory_reset: bool,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn identity(config: &Config, simulate: bool) -> Result<Box<dyn HardwareIdentity>> {
    if let Some(eui64) = &config.matter.eui64 {
        let eui: Eui64 = eui64.parse()?;
        return Ok(Box::new(FixedIdentity(eui)));
    }
    match config.matter.interface.clone().or_else(detect_interface) {
        Some(interface) => Ok(Box::new(InterfaceIdentity::new(interface))),
        None if simulate => Ok(Box::new(FixedIdentity(Eui64::from_mac48(SIMULATED_MAC)))),
        None => Err(BridgeError::InvalidIdentity(
            "no network interface to read a hardware address from".into(),
        )),
    }
}

/// Wire the vent to the bridge and bring the stack up.
fn bring_up<P: MatterPlatform + 'static>(
    platform: Arc<P>,
    config: &Config,
    identity: &dyn HardwareIdentity,
    vent: &Arc<SimulatedVent>,
    json: bool,
) -> Result<VentBridge<P>> {
    let bridge = VentBridge::new(
        platform,
        BridgeConfig {
            vendor_name: config.matter.vendor_name.clone(),
            product_name: config.matter.product_name.clone(),
            radio: config.radio,
        },
    );

    bridge.init(Callbacks::from_sink(vent.clone()), identity)?;
    if let Some(reporter) = bridge.reporter() {
        vent.attach_reporter(reporter);
    }
    bridge.start()?;

    let info = bridge.pairing_info()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        info!("Pairing information:");
        info!("  Discriminator: {}", info.discriminator);
        info!("  Manual code:   {}", info.manual_pairing_code);
        info!("  QR payload:    {}", info.qr_payload);
        info!("  Commissioned:  {}", info.commissioned);
    }
    Ok(bridge)
}

async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env();
    if cli.interface.is_some() {
        config.matter.interface = cli.interface.clone();
    }

    info!("Configuration loaded:");
    info!("  Product: {} by {}", config.matter.product_name, config.matter.vendor_name);
    info!("  Vendor ID: 0x{:04X}", config.matter.vendor_id);
    info!("  Product ID: 0x{:04X}", config.matter.product_id);
    info!(
        "  Interface: {}",
        config.matter.interface.as_deref().unwrap_or("auto")
    );

    let identity = identity(&config, cli.simulate)?;
    let vent = SimulatedVent::new(
        config.actuator.initial_angle,
        Duration::from_millis(config.actuator.step_delay_ms),
    );
    let vent_task = vent.spawn();

    if cli.simulate {
        info!("Running against the simulated Matter stack");
        let platform = Arc::new(SimulatedPlatform::default());
        let bridge = bring_up(platform.clone(), &config, identity.as_ref(), &vent, cli.json)?;
        if cli.factory_reset {
            bridge.factory_reset();
        }

        // The simulated stack has no event loop of its own; drain deferred work here.
        let pending_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(250));
            loop {
                interval.tick().await;
                if platform.process_pending() {
                    info!("[Sim] Factory reset completed");
                }
            }
        });

        wait_for_shutdown().await;
        pending_task.abort();
    } else {
        let platform = Arc::new(RsMatterPlatform::new(config.matter.clone()));
        let bridge = bring_up(platform, &config, identity.as_ref(), &vent, cli.json)?;
        if cli.factory_reset {
            warn!("Factory reset requested from the command line");
            bridge.factory_reset();
        }

        info!("Vent bridge is running, press Ctrl+C to exit");
        wait_for_shutdown().await;
    }

    vent_task.abort();
    Ok(())
}

fn main() {
    // .env must be applied before the runtime starts its worker threads
    load_dotenv();
    init_logger();
    info!("Starting Vent Matter Bridge");

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli)) {
        error!("Vent bridge failed: {}", e);
        std::process::exit(1);
    }
}
