use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gadget_composer::config::{self, SpaceConfig};
use gadget_composer::hid::ReportWriter;
use gadget_composer::otg::configfs::is_configfs_available;
use gadget_composer::otg::hid::device_node;
use gadget_composer::otg::{
    ControlSurface, Force, Gadget, GadgetSpace, GadgetState, Materialization, MemorySurface,
    SysFs,
};

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

/// gadget-composer command line arguments
#[derive(Parser, Debug)]
#[command(name = "gadget-composer")]
#[command(version, about = "Compose USB gadgets through ConfigFS", long_about = None)]
struct CliArgs {
    /// ConfigFS mount point (default: /sys/kernel/config)
    #[arg(long, value_name = "PATH", global = true)]
    configfs: Option<PathBuf>,

    /// UDC registry (default: /sys/class/udc)
    #[arg(long, value_name = "PATH", global = true)]
    udc_path: Option<PathBuf>,

    /// Log level (error, warn, info, verbose, debug, trace)
    #[arg(
        short = 'l',
        long,
        value_name = "LEVEL",
        default_value = "info",
        global = true
    )]
    log_level: LogLevel,

    /// Increase verbosity (-v for verbose, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the gadget described by a TOML or JSON file
    Apply {
        /// Gadget description file
        file: PathBuf,
        /// Reuse existing directories and rewrite their attributes
        #[arg(long)]
        force: bool,
        /// Activate the gadget once created, even if it already existed
        #[arg(long)]
        enable: bool,
        /// Controller to activate on (default: first unclaimed); implies --enable
        #[arg(long, value_name = "NAME")]
        udc: Option<String>,
        /// Print the operations instead of touching the host
        #[arg(long)]
        dry_run: bool,
    },
    /// List USB Device Controllers
    Udcs {
        /// Include controllers already claimed by a gadget
        #[arg(long)]
        all: bool,
    },
    /// List controllers claimed by existing gadgets
    Claimed,
    /// Activate an existing gadget
    Enable {
        /// Gadget name under usb_gadget/
        gadget: String,
        /// Controller to activate on (default: first unclaimed)
        #[arg(long, value_name = "NAME")]
        udc: Option<String>,
    },
    /// Type text on a HID keyboard gadget device
    Type {
        /// Device node or HID function index (e.g. /dev/hidg0 or 0)
        device: String,
        /// Text to type
        text: String,
    },
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    init_logging(args.log_level, args.verbose);

    let cli_space = SpaceConfig {
        configfs_path: args.configfs,
        udc_path: args.udc_path,
    };

    match args.command {
        Command::Apply {
            file,
            force,
            enable,
            udc,
            dry_run,
        } => apply(&file, cli_space, force, enable, udc, dry_run),
        Command::Udcs { all } => {
            let space = system_space(cli_space.or(SpaceConfig::from_env()));
            for udc in space.udcs(!all)? {
                println!("{}", udc);
            }
            Ok(())
        }
        Command::Claimed => {
            let space = system_space(cli_space.or(SpaceConfig::from_env()));
            for udc in space.bound_udcs()? {
                println!("{}", udc);
            }
            Ok(())
        }
        Command::Enable { gadget, udc } => {
            let space = system_space(cli_space.or(SpaceConfig::from_env()));
            let mut gadget = Gadget::new(gadget);
            gadget.bind_to_space(Arc::new(space), false)?;
            gadget.enable(udc.as_deref())?;
            println!("{} {}", gadget.name(), gadget.udc().unwrap_or_default());
            Ok(())
        }
        Command::Type { device, text } => {
            let mut writer = ReportWriter::open(device_node(&device))?;
            writer.write_text(&text)?;
            Ok(())
        }
    }
}

fn apply(
    file: &Path,
    cli_space: SpaceConfig,
    force: bool,
    enable: bool,
    udc: Option<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let description = config::load(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    let space_config = cli_space
        .or(description.space.clone())
        .or(SpaceConfig::from_env());

    let mut gadget = description.gadget.build()?;

    let recorder = dry_run.then(|| recording_surface(&space_config));
    let space = match &recorder {
        Some(surface) => GadgetSpace::new(
            space_config.configfs_path(),
            space_config.udc_path(),
            Box::new(surface.clone()),
        ),
        None => {
            if !is_configfs_available(&space_config.configfs_path()) {
                tracing::warn!(
                    "No usb_gadget directory under {}, is libcomposite loaded?",
                    space_config.configfs_path().display()
                );
            }
            system_space(space_config)
        }
    };

    gadget.bind_to_space(Arc::new(space), false)?;
    let activate = enable || udc.is_some();
    match materialize(&mut gadget, force, activate, udc)? {
        Materialization::Created => tracing::info!("Created gadget {}", gadget.name()),
        Materialization::AlreadyPresent { path } => {
            println!("{} already exists, pass --force to update it", path.display())
        }
    }

    if let Some(surface) = recorder {
        for op in surface.ops() {
            println!("{}", op);
        }
    }
    tracing::info!("Gadget {} is {:?}", gadget.name(), gadget.state());
    Ok(())
}

/// Materialize a bound gadget, then activate it when asked to.
///
/// Activation also runs when the gadget already existed, using `udc`, else
/// the controller from the description, else the first unclaimed one.
fn materialize(
    gadget: &mut Gadget,
    force: bool,
    activate: bool,
    udc: Option<String>,
) -> gadget_composer::Result<Materialization> {
    let outcome = gadget.add_to_space(Force::from(force))?;
    let pending = udc.is_some() || gadget.state() != GadgetState::Active;
    if activate && pending {
        let udc = udc.or_else(|| gadget.udc().map(str::to_string));
        gadget.enable(udc.as_deref())?;
    }
    Ok(outcome)
}

fn system_space(space: SpaceConfig) -> GadgetSpace {
    GadgetSpace::new(space.configfs_path(), space.udc_path(), Box::new(SysFs))
}

/// In-memory surface mirroring the host's gadget root and controllers
fn recording_surface(space: &SpaceConfig) -> MemorySurface {
    let surface = MemorySurface::new();
    let gadget_root = space.configfs_path().join("usb_gadget");
    surface.seed_dir(&gadget_root);

    let udc_root = space.udc_path();
    surface.seed_dir(&udc_root);
    if let Ok(controllers) = SysFs.list_dir(&udc_root) {
        for name in controllers {
            surface.seed_dir(udc_root.join(name));
        }
    }
    surface
}

/// Filter directives for a log level
fn log_filter(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "gadget_composer=error",
        LogLevel::Warn => "gadget_composer=warn",
        LogLevel::Info => "gadget_composer=info",
        // per-file projection steps stay hidden below debug
        LogLevel::Verbose => "gadget_composer=debug,gadget_composer::otg::space=info",
        LogLevel::Debug => "gadget_composer=debug",
        LogLevel::Trace => "gadget_composer=trace",
    }
}

/// Initialize logging with tracing
fn init_logging(level: LogLevel, verbose_count: u8) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Verbose,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = log_filter(effective_level);

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}
