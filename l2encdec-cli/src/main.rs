use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use l2encdec_core::{
    ChecksumResult, CipherType, Params, decode, detect_protocol, encode, init_params,
    protocol_from_filename, verify_checksum,
};

/// Hex symbols in an explicit tail (20 bytes)
const TAIL_HEX_LEN: usize = 40;

#[derive(Parser)]
#[command(name = "l2encdec")]
#[command(about = "Lineage II client file (en|de)coder – CLI tool", long_about = None)]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Print debug diagnostics; RUST_LOG takes precedence
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    /// File to process with defaults: encoded if its name starts with `dec-`, decoded otherwise
    input: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a plaintext file
    Encode {
        #[command(flatten)]
        args: CodecArgs,
    },

    /// Decode an encoded file
    Decode {
        /// Verify the footer checksum before decoding
        #[arg(short = 'v', long)]
        verify: bool,

        #[command(flatten)]
        args: CodecArgs,
    },
}

#[derive(Args, Default)]
struct CodecArgs {
    /// Path to the input file
    input: PathBuf,

    /// Path to write the output; defaults to a prefixed name next to the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Protocol used for default params: 111, 120, 121, 211-212, 411-414
    #[arg(short, long)]
    protocol: Option<i32>,

    /// Do not add a tail on encode, expect none on decode (e.g. Exteel files)
    #[arg(short = 't', long)]
    skip_tail: bool,

    /// Do not add a header on encode, expect none on decode
    #[arg(short = 'H', long)]
    skip_header: bool,

    /// Use the legacy RSA keys; decode only, protocols 411-414
    #[arg(short = 'l', long)]
    legacy: bool,

    /// Override the cipher
    #[arg(short = 'a', long, value_enum)]
    algorithm: Option<Algorithm>,

    /// Custom modulus (hex) for `rsa`
    #[arg(short = 'm', long)]
    modulus: Option<String>,

    /// Custom exponent (hex) for `rsa`, used for both directions
    #[arg(short = 'e', long, short_alias = 'd')]
    exponent: Option<String>,

    /// Custom key for `blowfish`
    #[arg(short = 'b', long)]
    blowfish_key: Option<String>,

    /// Custom key for `xor`, decimal or 0x-prefixed hex
    #[arg(short = 'x', long, value_parser = parse_byte)]
    xor_key: Option<u8>,

    /// Custom start index for `xor_position`, decimal or 0x-prefixed hex
    #[arg(short = 's', long, value_parser = parse_number)]
    start_index: Option<u32>,

    /// Filename used as the `xor_filename` key instead of the input name
    #[arg(short = 'f', long)]
    filename: Option<String>,

    /// Custom wide-character header; default is Lineage2Ver<protocol>
    #[arg(short = 'w', long)]
    header: Option<String>,

    /// Custom tail as 40 hex symbols; carries the checksum by default
    #[arg(short = 'T', long, value_parser = parse_tail)]
    tail: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Algorithm {
    Blowfish,
    Rsa,
    Xor,
    #[value(name = "xor_position")]
    XorPosition,
    #[value(name = "xor_filename")]
    XorFilename,
}

impl From<Algorithm> for CipherType {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Blowfish => CipherType::Blowfish,
            Algorithm::Rsa => CipherType::Rsa,
            Algorithm::Xor => CipherType::Xor,
            Algorithm::XorPosition => CipherType::XorPosition,
            Algorithm::XorFilename => CipherType::XorFilename,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match (cli.command, cli.input) {
        (Some(Commands::Encode { args }), _) => {
            cmd_encode(&args)?;
        }
        (Some(Commands::Decode { verify, args }), _) => {
            cmd_decode(&args, verify)?;
        }
        (None, Some(input)) => {
            let args = CodecArgs {
                input,
                ..CodecArgs::default()
            };
            if is_decoded_name(&file_name(&args.input)) {
                cmd_encode(&args)?;
            } else {
                cmd_decode(&args, false)?;
            }
        }
        (None, None) => bail!("No input file given; see --help"),
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn cmd_encode(args: &CodecArgs) -> Result<()> {
    let input = fs::read(&args.input)
        .with_context(|| format!("Failed to read input file: {}", args.input.display()))?;
    let name = file_name(&args.input);

    println!("[info] len(input)={}", input.len());

    let protocol = args.protocol.or_else(|| {
        let found = protocol_from_filename(&name).map(i32::from);
        if let Some(p) = found {
            info!("using protocol {p} from file name");
        }
        found
    });
    let params = resolve_params(args, protocol, &name)?;

    let enc = encode(&input, &params)
        .with_context(|| format!("Failed to encode with protocol {}", params.protocol))?;

    let out_path = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_file_name(encoded_name(&name)));
    fs::write(&out_path, &enc)
        .with_context(|| format!("Failed to write output file: {}", out_path.display()))?;

    println!("[ok] wrote encoded file -> {}", out_path.display());

    Ok(())
}

fn cmd_decode(args: &CodecArgs, verify: bool) -> Result<()> {
    let input = fs::read(&args.input)
        .with_context(|| format!("Failed to read input file: {}", args.input.display()))?;
    let name = file_name(&args.input);

    println!("[info] len(input)={}", input.len());

    let protocol = args.protocol.or_else(|| {
        let found = detect_protocol(&input).map(i32::from);
        if let Some(p) = found {
            info!("detected protocol {p} from header");
        }
        found
    });
    let params = resolve_params(args, protocol, &name)?;

    if verify && !params.skip_tail {
        match verify_checksum(&input) {
            ChecksumResult::Success => println!("[info] checksum -> OK"),
            ChecksumResult::Mismatch => bail!("Checksum mismatch in {}", args.input.display()),
        }
    }

    let dec = decode(&input, &params)
        .with_context(|| format!("Failed to decode with protocol {}", params.protocol))?;

    let out_path = args.output.clone().unwrap_or_else(|| {
        args.input
            .with_file_name(decoded_name(protocol.unwrap_or_default(), &name))
    });
    fs::write(&out_path, &dec)
        .with_context(|| format!("Failed to write output file: {}", out_path.display()))?;

    println!("[ok] wrote decoded file -> {}", out_path.display());

    Ok(())
}

/// Protocol defaults with every command-line override applied
fn resolve_params(args: &CodecArgs, protocol: Option<i32>, input_name: &str) -> Result<Params> {
    let filename = args.filename.as_deref().unwrap_or(input_name);

    let mut params = match protocol {
        Some(p) => match init_params(p, filename, args.legacy) {
            Ok(params) => params,
            Err(e) if args.algorithm.is_some() => {
                warn!("{e}, continuing with custom parameters");
                Params::default()
            }
            Err(e) => return Err(e).context("Failed to resolve protocol defaults"),
        },
        None if args.algorithm.is_some() => Params::default(),
        None => bail!("Cannot determine the protocol of {input_name}; pass -p <protocol>"),
    };

    params.filename = filename.to_string();
    params.skip_header = args.skip_header;
    params.skip_tail = args.skip_tail;

    if let Some(header) = &args.header {
        params.header = header.clone();
    }
    if let Some(tail) = &args.tail {
        params.tail = tail.clone();
    }
    if let Some(algorithm) = args.algorithm {
        params.cipher = algorithm.into();
    }
    if let Some(modulus) = &args.modulus {
        params.rsa_modulus = modulus.clone();
    }
    if let Some(exponent) = &args.exponent {
        params.rsa_public_exponent = exponent.clone();
        params.rsa_private_exponent = exponent.clone();
    }
    if let Some(key) = &args.blowfish_key {
        params.block_cipher_key = key.as_bytes().to_vec();
    }
    if let Some(key) = args.xor_key {
        params.xor_key = key;
    }
    if let Some(start) = args.start_index {
        params.xor_start_position = start;
    }

    debug!("resolved params: {:?}", params);
    Ok(params)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Names written by decode, which the single-file mode encodes back
fn is_decoded_name(input_name: &str) -> bool {
    input_name.starts_with("dec-")
}

fn encoded_name(input_name: &str) -> String {
    format!("enc-{input_name}")
}

fn decoded_name(protocol: i32, input_name: &str) -> String {
    format!("dec-{protocol}-{input_name}")
}

fn parse_number(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number {s:?}: {e}"))
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let value = parse_number(s)?;
    u8::try_from(value).map_err(|_| format!("{s:?} does not fit in a byte"))
}

fn parse_tail(s: &str) -> Result<String, String> {
    if s.len() != TAIL_HEX_LEN {
        return Err(format!("tail must be exactly {TAIL_HEX_LEN} hex symbols (20 bytes)"));
    }
    if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("tail {s:?} is not hex"));
    }
    Ok(s.to_string())
}
