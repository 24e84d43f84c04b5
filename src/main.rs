mod captions;
mod commands;
mod completion;
mod config;
mod conversation;
mod discord;
mod error;
mod store;
mod video;

#[cfg(test)]
mod testing;

use crate::captions::HttpCaptionFetcher;
use crate::commands::followup::handle_follow_up;
use crate::commands::slash::{handle_slash_command, register_slash_commands};
use crate::commands::Services;
use crate::completion::OpenAiClient;
use crate::config::BotConfig;
use crate::discord::{is_bot_thread, DiscordThreads};
use crate::store::ConversationStore;
use crate::video::YtDlp;
use log::{debug, error, info, warn};
use serenity::{
    async_trait,
    client::{Client, Context, EventHandler},
    model::application::interaction::Interaction,
    model::channel::{Channel, Message},
    model::gateway::Ready,
    prelude::GatewayIntents,
};
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;

// Event handler implementation
struct Handler {
    services: Arc<Services>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("✅ Bot connected as {}! (ID: {})", ready.user.name, ready.user.id);
        if let Err(e) = register_slash_commands(&ctx.http).await {
            error!("❌ Failed to sync slash commands: {}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::ApplicationCommand(command) = interaction {
            debug!("Slash command /{} from {} ({})", command.data.name, command.user.name, command.user.id);
            if let Err(e) = handle_slash_command(&ctx, &self.services, &command).await {
                error!(
                    "❌ /{} failed for user {} ({}): {}",
                    command.data.name, command.user.name, command.user.id, e
                );
            }
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let bot_id = ctx.cache.current_user_id();
        if msg.author.id == bot_id {
            return;
        }

        // Cheap check first: only tracked summary threads are interesting.
        if !self.services.store.contains(msg.channel_id).await {
            return;
        }

        let channel = match msg.channel(&ctx).await {
            Ok(Channel::Guild(channel)) => channel,
            Ok(_) => return,
            Err(e) => {
                warn!("Could not look up channel {}: {}", msg.channel_id, e);
                return;
            }
        };
        if !is_bot_thread(channel.kind, channel.owner_id, bot_id) {
            return;
        }

        let threads = DiscordThreads::new(ctx.http.clone());
        let user = msg.author.id.to_string();
        if let Err(e) = handle_follow_up(&self.services, &threads, msg.channel_id, &user, &msg.content).await {
            error!("❌ Follow-up in thread {} failed for user {}: {}", msg.channel_id, msg.author.name, e);
        }
    }
}

// Operator console on stdin: quit / status / help
async fn handle_command_line(shutdown_tx: mpsc::Sender<String>, store: Arc<ConversationStore>) {
    println!("📝 Command line interface active. Type 'help' for available commands.");

    let mut reader = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        if stdout.write_all(b"> ").await.is_err() || stdout.flush().await.is_err() {
            eprintln!("❌ Failed to write prompt");
            break;
        }

        let command = match reader.next_line().await {
            Ok(Some(line)) => line.trim().to_lowercase(),
            Ok(None) => break,
            Err(e) => {
                eprintln!("❌ Error reading command line: {}", e);
                break;
            }
        };

        match command.as_str() {
            "quit" | "q" | "exit" => {
                println!("⏹️  Shutting down bot...");
                if shutdown_tx.send(command).await.is_err() {
                    eprintln!("❌ Failed to send shutdown signal");
                }
                break;
            }
            "help" | "h" => {
                println!("🤖 Available commands:");
                println!("  quit, q, exit  - Stop the bot gracefully");
                println!("  help, h        - Show this help message");
                println!("  status         - Show bot status");
            }
            "status" => {
                println!("🤖 Bot Status: Running");
                println!("🧵 Tracked summary threads: {}", store.len().await);
            }
            "" => {}
            _ => println!("❓ Unknown command: '{}'. Type 'help' for available commands.", command),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logger - must be done before any logging calls
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = match BotConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Invalid configuration: {}", e);
            eprintln!("Create a botconfig.txt in the project root with DISCORD_TOKEN=... and OPENAI_API_KEY=...");
            return;
        }
    };

    let completions = match OpenAiClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("❌ Could not build the completion client: {}", e);
            return;
        }
    };
    let captions = match HttpCaptionFetcher::new() {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("❌ Could not build the caption client: {}", e);
            return;
        }
    };
    info!("🤖 Using model '{}'", completions.model());

    let store = Arc::new(ConversationStore::new());
    let services = Arc::new(Services {
        videos: Arc::new(YtDlp::new(config.ytdlp_path.clone())),
        captions: Arc::new(captions),
        completions: Arc::new(completions),
        store: store.clone(),
        thread_auto_archive_minutes: config.thread_auto_archive_minutes,
    });

    // Configure bot intents
    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;

    let mut client = match Client::builder(&config.discord_token, intents)
        .event_handler(Handler { services })
        .await
    {
        Ok(client) => client,
        Err(e) => {
            error!("❌ Error creating Discord client: {:?}", e);
            eprintln!("Check DISCORD_TOKEN in botconfig.txt");
            return;
        }
    };

    // Set up command line interface for graceful shutdown
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<String>(1);
    let cmd_task = tokio::spawn(handle_command_line(shutdown_tx, store));

    println!("🚀 Bot is running...");
    println!("💡 Use 'quit' command to stop gracefully, or press Ctrl+C");
    tokio::select! {
        _ = signal::ctrl_c() => {
            println!("\n⏹️ Stopping bot gracefully...");
        }
        shutdown_signal = shutdown_rx.recv() => {
            if let Some(signal) = shutdown_signal {
                println!("📡 Received '{}' command, stopping bot gracefully...", signal);
            }
        }
        result = client.start() => {
            if let Err(why) = result {
                error!("❌ Client error: {:?}", why);
            }
        }
    }

    client.shard_manager.lock().await.shutdown_all().await;
    cmd_task.abort();

    // Conversation state is in-memory only and is dropped here.
    println!("✅ Bot stopped");
}
