//! digit_classifier CLI
//!
//! Commands:
//! - `predict` - 画像1枚を分類
//! - `batch`   - ディレクトリ内の画像を分類してCSVに出力
//! - `config`  - 設定の表示・初期化

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::model::AppConfig;
use crate::types::InputSource;

/// Handwritten digit classifier
#[derive(Parser, Debug)]
#[command(name = "digit_classifier")]
#[command(author, version, about = "Classify handwritten digits (0-9) with a pre-trained CNN")]
pub struct Cli {
    /// 設定ファイル (JSON)
    #[arg(long, global = true, env = "DIGIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// モデルアーカイブ (設定ファイルより優先)
    #[arg(long, global = true, env = "DIGIT_MODEL")]
    pub model: Option<PathBuf>,

    /// 詳細ログ
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SourceArg {
    Drawing,
    Upload,
}

impl From<SourceArg> for InputSource {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Drawing => InputSource::Drawing,
            SourceArg::Upload => InputSource::Upload,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a single image
    Predict {
        /// PNG/JPEG image
        image: PathBuf,
        #[arg(long, value_enum, default_value = "upload")]
        source: SourceArg,
        /// Force color inversion
        #[arg(long, conflicts_with = "no_invert")]
        invert: bool,
        /// Disable color inversion
        #[arg(long)]
        no_invert: bool,
        /// Show raw prediction scores
        #[arg(long)]
        show_scores: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify every PNG/JPEG in a directory and write a CSV report
    Batch {
        dir: PathBuf,
        #[arg(short, long, default_value = "predictions.csv")]
        output: PathBuf,
        #[arg(long, value_enum, default_value = "upload")]
        source: SourceArg,
        #[arg(long)]
        no_invert: bool,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        #[arg(long)]
        force: bool,
    },
}

fn invert_override(invert: bool, no_invert: bool) -> Option<bool> {
    match (invert, no_invert) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "info,digit_classifier_lib=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> AppConfig {
    let path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load_or_default_from(&path);
    if let Some(model) = &cli.model {
        config.set_model_path(model.to_string_lossy().to_string());
    }
    config
}

/// CLIのエントリポイント
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(&cli);

    match &cli.command {
        Commands::Config(ConfigCommands::Show) => {
            config.display();
            Ok(())
        }
        Commands::Config(ConfigCommands::Init { force }) => {
            let path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
            if path.exists() && !force {
                anyhow::bail!("{} は既に存在します (--force で上書き)", path.display());
            }
            AppConfig::default().save(&path)?;
            println!("設定ファイルを保存しました: {}", path.display());
            Ok(())
        }
        Commands::Predict {
            image,
            source,
            invert,
            no_invert,
            show_scores,
            json,
        } => run_predict(config, image, (*source).into(), invert_override(*invert, *no_invert), *show_scores, *json),
        Commands::Batch {
            dir,
            output,
            source,
            no_invert,
        } => run_batch(config, dir, output, (*source).into(), no_invert.then_some(false)),
    }
}

#[cfg(feature = "ml")]
fn run_predict(
    config: AppConfig,
    image: &Path,
    source: InputSource,
    invert: Option<bool>,
    show_scores: bool,
    json: bool,
) -> Result<()> {
    use crate::app::DigitApp;
    use crate::presentation::ModelInfo;

    let app = DigitApp::start(config)?;
    tracing::info!("{:?}", ModelInfo::from_config(app.classifier().model().config()));

    let picture = crate::input::open_image_file(image)?;
    let classification = app.classify_image(&picture, source, invert)?;
    let view = app.view(&classification, show_scores)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", view.summary());
    }
    Ok(())
}

#[cfg(feature = "ml")]
fn run_batch(
    config: AppConfig,
    dir: &Path,
    output: &Path,
    source: InputSource,
    invert: Option<bool>,
) -> Result<()> {
    use crate::app::{collect_image_files, write_report_csv, DigitApp};

    let app = DigitApp::start(config)?;
    let files = collect_image_files(dir)?;
    if files.is_empty() {
        anyhow::bail!("画像が見つかりません: {}", dir.display());
    }

    let results = app.classify_files(&files, source, invert);
    let file = std::fs::File::create(output)?;
    write_report_csv(&results, file)?;

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    println!(
        "{}枚を分類しました (失敗 {}枚): {}",
        results.len(),
        failed,
        output.display()
    );
    Ok(())
}

#[cfg(not(feature = "ml"))]
fn run_predict(_: AppConfig, _: &Path, _: InputSource, _: Option<bool>, _: bool, _: bool) -> Result<()> {
    anyhow::bail!("ML機能が有効化されていません")
}

#[cfg(not(feature = "ml"))]
fn run_batch(_: AppConfig, _: &Path, _: &Path, _: InputSource, _: Option<bool>) -> Result<()> {
    anyhow::bail!("ML機能が有効化されていません")
}
