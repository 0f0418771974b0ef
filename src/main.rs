use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use section_recommender::recommend::DisplayOutcome;
use section_recommender::sources::corpus::{ArticleFolderCorpus, JsonLinesCorpus};
use section_recommender::sources::offline::{OfflineArticles, OfflinePosts};
use section_recommender::sources::timeline::TimelineSource;
use section_recommender::sources::top_stories::TopStoriesSource;
use section_recommender::{
    ArticleSource, CategoryOutcome, Config, CorpusLoader, Error, ModelBundle, PostSource, Recommender,
};

#[derive(Parser, Debug)]
#[command(
    name = "section-recommender",
    about = "Recommend news sections and articles from a user's recent posts"
)]
struct Cli {
    /// TOML settings file; built-in defaults are used when omitted.
    #[arg(long, global = true, env = "SECTION_RECOMMENDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit the vectorizer and classifier on a labeled corpus.
    Train(TrainArgs),
    /// Recommend articles for a user or a file of posts.
    Recommend(RecommendArgs),
    /// Summarize a trained model.
    Inspect(ModelArgs),
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Model bundle; defaults to `[model] path` from the settings.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Vectorizer state file written by `train --split-*`.
    #[arg(long, requires = "classifier_state", conflicts_with = "model")]
    vectorizer_state: Option<PathBuf>,

    /// Classifier state file written by `train --split-*`.
    #[arg(long, requires = "vectorizer_state")]
    classifier_state: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Folder of `Articles_<Section>*.json` files.
    #[arg(long, conflicts_with = "corpus_jsonl", required_unless_present = "corpus_jsonl")]
    corpus_dir: Option<PathBuf>,

    /// JSON Lines file of `{"text": ..., "label": ...}` records.
    #[arg(long)]
    corpus_jsonl: Option<PathBuf>,

    /// Where to write the bundle; defaults to `[model] path`.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also write the vectorizer state to its own file.
    #[arg(long, requires = "split_classifier")]
    split_vectorizer: Option<PathBuf>,

    /// Also write the classifier state to its own file.
    #[arg(long, requires = "split_vectorizer")]
    split_classifier: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RecommendArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Handle whose timeline is read, with or without a leading `@`.
    #[arg(long, conflicts_with = "posts_file", required_unless_present = "posts_file")]
    user: Option<String>,

    /// Text file with one post per line, used instead of a timeline.
    #[arg(long)]
    posts_file: Option<PathBuf>,

    /// JSON file of candidate articles keyed by section, used instead of
    /// the top stories service.
    #[arg(long)]
    candidates_file: Option<PathBuf>,

    #[arg(long)]
    num_posts: Option<usize>,

    #[arg(long)]
    num_categories: Option<usize>,

    /// Print the outcomes as JSON instead of prose.
    #[arg(long, default_value_t = false)]
    json: bool,

    #[arg(long, env = "NYT_TOP_STORIES_KEY", hide_env_values = true)]
    top_stories_key: Option<String>,

    #[arg(long, env = "TWITTER_BEARER_TOKEN", hide_env_values = true)]
    bearer_token: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<Error>() {
                Some(lib_err) => eprintln!("{}", lib_err.user_message()),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    match cli.command {
        Command::Train(args) => train(&config, args),
        Command::Recommend(args) => recommend(&config, args),
        Command::Inspect(args) => inspect(&config, &args),
    }
}

fn train(config: &Config, args: TrainArgs) -> Result<()> {
    let loader: Box<dyn CorpusLoader> = match (args.corpus_dir, args.corpus_jsonl) {
        (Some(dir), _) => Box::new(ArticleFolderCorpus::new(dir)),
        (None, Some(path)) => Box::new(JsonLinesCorpus::new(path)),
        (None, None) => anyhow::bail!("either --corpus-dir or --corpus-jsonl is required"),
    };
    let documents = loader.load()?;
    let (bundle, report) = config.training_pipeline().run(&documents)?;

    let output = args.output.unwrap_or_else(|| config.model.path.clone());
    bundle.save(&output)?;
    if let (Some(vectorizer), Some(classifier)) = (args.split_vectorizer, args.split_classifier) {
        bundle.save_split(vectorizer, classifier)?;
    }

    println!("documents:      {} ({} skipped without text)", report.kept, report.skipped_empty);
    println!("features:       {}", report.n_features);
    println!("classes:        {}", report.classes.len());
    println!("train accuracy: {:.3}", report.train_accuracy);
    println!("fingerprint:    {}", bundle.fingerprint());
    println!("written to:     {}", output.display());
    Ok(())
}

fn load_model(config: &Config, args: &ModelArgs) -> Result<ModelBundle> {
    let bundle = match (&args.vectorizer_state, &args.classifier_state) {
        (Some(vectorizer), Some(classifier)) => ModelBundle::load_split(vectorizer, classifier)?,
        _ => {
            let path = args.model.as_ref().unwrap_or(&config.model.path);
            ModelBundle::load(path)?
        }
    };
    Ok(bundle)
}

#[derive(Serialize)]
struct OutcomeJson<'a> {
    category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommendation: Option<&'a section_recommender::Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn recommend(config: &Config, args: RecommendArgs) -> Result<()> {
    let model = Arc::new(load_model(config, &args.model)?);

    let articles: Box<dyn ArticleSource> = match &args.candidates_file {
        Some(path) => Box::new(OfflineArticles::from_file(path)?),
        None => {
            let key = args.top_stories_key.clone().unwrap_or_default();
            Box::new(TopStoriesSource::new(&config.sources, key)?)
        }
    };
    let posts: Box<dyn PostSource> = match (&args.posts_file, &args.user) {
        (Some(path), _) => Box::new(OfflinePosts::from_file(path)?),
        (None, Some(_)) => {
            let token = args.bearer_token.as_deref().unwrap_or_default();
            Box::new(TimelineSource::new(&config.sources, token)?)
        }
        (None, None) => anyhow::bail!("either --user or --posts-file is required"),
    };
    let user = args.user.clone().unwrap_or_default();

    let num_posts = args.num_posts.unwrap_or(config.recommend.num_posts);
    let num_categories = args.num_categories.unwrap_or(config.recommend.num_categories);
    let recommender = Recommender::new(model, articles);
    let outcomes = recommender.recommend_for_user(&*posts, &user, num_posts, num_categories)?;

    if args.json {
        let rows: Vec<OutcomeJson<'_>> = outcomes.iter().map(outcome_json).collect();
        println!("{}", serde_json::to_string_pretty(&rows).context("failed to encode outcomes")?);
    } else {
        for (rank, outcome) in outcomes.iter().enumerate() {
            println!("{}", DisplayOutcome { rank, outcome });
        }
    }
    Ok(())
}

fn outcome_json(outcome: &CategoryOutcome) -> OutcomeJson<'_> {
    OutcomeJson {
        category: outcome.category.to_string(),
        recommendation: outcome.recommendation(),
        error: outcome.result.as_ref().err().map(Error::user_message),
    }
}

fn inspect(config: &Config, args: &ModelArgs) -> Result<()> {
    let bundle = load_model(config, args)?;
    let classes: Vec<String> = bundle.classes()?.iter().map(|c| c.to_string()).collect();
    let vectorizer = bundle.vectorizer().config();
    println!("format version: {}", bundle.format_version());
    println!("fingerprint:    {}", bundle.fingerprint());
    println!("features:       {}", bundle.n_features()?);
    println!("classes:        {}", classes.join(", "));
    println!("ngram range:    {:?}", vectorizer.ngram_range);
    println!("df bounds:      min {} / max {}", vectorizer.min_df, vectorizer.max_df);
    println!("iterations:     {}", bundle.classifier().state()?.n_iter);
    Ok(())
}
