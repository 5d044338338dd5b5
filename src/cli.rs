use crate::api::ApiClient;
use crate::app::{WatchApp, WatchOptions};
use crate::config::Config;
use crate::format::{
    format_cost, format_duration, format_model_name, format_path, format_relative_time,
    format_session_id, truncate_text,
};
use crate::settings::JsonFileSettings;
use crate::transcript::{filter_visible, group_entries, merge_transcript};
use crate::types::{
    ConversationListQuery, PermissionListQuery, PermissionStatus, ResumeConversationRequest,
    SortBy, SortOrder, StartConversationRequest,
};
use crate::ui::render::{plain_text, transcript_lines, Theme};
use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Created,
    Updated,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Pending,
    Approved,
    Denied,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// List conversations
    List {
        /// Only conversations started in this project directory
        #[arg(long)]
        project: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        offset: Option<u32>,
        #[arg(long, value_enum, default_value = "updated")]
        sort_by: SortField,
        #[arg(long, value_enum, default_value = "desc")]
        order: Order,
    },

    /// Print a conversation transcript
    Show {
        session_id: String,
        /// Include tool result messages
        #[arg(long)]
        tool_results: bool,
        /// Print collapsible blocks in full
        #[arg(long)]
        expand: bool,
    },

    /// Start a new conversation
    Start {
        /// Initial prompt
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
        /// Working directory for the assistant (defaults to the current directory)
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(short, long)]
        model: Option<String>,
        #[arg(long, value_delimiter = ',')]
        allowed_tools: Option<Vec<String>>,
        #[arg(long, value_delimiter = ',')]
        disallowed_tools: Option<Vec<String>>,
        #[arg(long)]
        system_prompt: Option<String>,
        /// Open the live view once started
        #[arg(short, long)]
        watch: bool,
    },

    /// Continue an existing conversation with a new message
    Resume {
        session_id: String,
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
        #[arg(short, long)]
        watch: bool,
    },

    /// Follow a streaming conversation in a full-screen view
    Watch {
        streaming_id: String,
        /// Show this conversation's history above the live stream
        #[arg(long)]
        session: Option<String>,
    },

    /// Stop a streaming conversation
    Stop { streaming_id: String },

    /// List permission requests
    Permissions {
        #[arg(long)]
        streaming_id: Option<String>,
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
    },

    /// Approve a pending permission request
    Approve { request_id: String },

    /// Deny a pending permission request
    Deny { request_id: String },

    /// Show backend status
    Status,

    /// List available models
    Models,
}

#[derive(Parser, Debug)]
#[command(name = "ccui", version, about = "Terminal client for the conversation backend", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Backend base URL (overrides CCUI_API_BASE_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

impl Args {
    /// Applies command-line overrides on top of the environment config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.api_url {
            config.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
    }
}

fn joined(words: &[String]) -> String {
    words.join(" ")
}

pub async fn run(args: Args, config: Config) -> Result<()> {
    let client = ApiClient::new(&config)?;
    match args.command {
        Command::List {
            project,
            limit,
            offset,
            sort_by,
            order,
        } => {
            let query = ConversationListQuery {
                project_path: project,
                limit: Some(limit),
                offset,
                sort_by: Some(match sort_by {
                    SortField::Created => SortBy::Created,
                    SortField::Updated => SortBy::Updated,
                }),
                order: Some(match order {
                    Order::Asc => SortOrder::Asc,
                    Order::Desc => SortOrder::Desc,
                }),
            };
            let response = client.list_conversations(&query).await?;
            if response.conversations.is_empty() {
                println!("No conversations");
            }
            let now = Utc::now();
            for conversation in &response.conversations {
                println!(
                    "{}  {:>10}  {:>4} msgs  {}  ({})",
                    format_session_id(&conversation.session_id),
                    format_relative_time(&conversation.updated_at, now),
                    conversation.message_count,
                    truncate_text(&conversation.summary, 60),
                    format_path(&conversation.project_path, 40),
                );
            }
            println!("{} of {} conversations", response.conversations.len(), response.total);
        }
        Command::Show {
            session_id,
            tool_results,
            expand,
        } => {
            let details = client.get_conversation(&session_id).await?;
            println!("{}", details.summary);
            println!(
                "{} · {} · {} · {}",
                details.project_path,
                format_model_name(&details.metadata.model),
                format_cost(details.metadata.total_cost),
                format_duration(details.metadata.total_duration),
            );
            println!();

            let entries = merge_transcript(&details.messages, &[], &session_id, None);
            let visible = filter_visible(entries, tool_results || config.show_tool_results);
            if visible.is_empty() {
                println!("No messages yet");
                return Ok(());
            }
            let lines = transcript_lines(&group_entries(&visible), &Theme::dark(), expand);
            println!("{}", plain_text(&lines));
        }
        Command::Start {
            prompt,
            dir,
            model,
            allowed_tools,
            disallowed_tools,
            system_prompt,
            watch,
        } => {
            let working_directory = dir.unwrap_or_else(|| config.working_dir.clone());
            let request = StartConversationRequest {
                working_directory: working_directory.to_string_lossy().into_owned(),
                initial_prompt: joined(&prompt),
                model,
                allowed_tools,
                disallowed_tools,
                system_prompt,
            };
            let response = client.start_conversation(&request).await?;
            println!("Started {}", response.session_id);
            println!("Stream: {}", response.stream_url);
            if watch {
                watch_stream(&config, client, response.session_id, None).await?;
            }
        }
        Command::Resume {
            session_id,
            message,
            watch,
        } => {
            let request = ResumeConversationRequest {
                session_id: session_id.clone(),
                message: joined(&message),
            };
            let response = client.resume_conversation(&request).await?;
            println!("Resumed {} as {}", session_id, response.session_id);
            if watch {
                watch_stream(&config, client, response.session_id, Some(session_id)).await?;
            }
        }
        Command::Watch {
            streaming_id,
            session,
        } => watch_stream(&config, client, streaming_id, session).await?,
        Command::Stop { streaming_id } => {
            let response = client.stop_conversation(&streaming_id).await?;
            if !response.success {
                bail!("backend refused to stop {streaming_id}");
            }
            println!("Stopped {streaming_id}");
        }
        Command::Permissions {
            streaming_id,
            status,
        } => {
            let query = PermissionListQuery {
                streaming_id,
                status: status.map(|status| match status {
                    StatusFilter::Pending => PermissionStatus::Pending,
                    StatusFilter::Approved => PermissionStatus::Approved,
                    StatusFilter::Denied => PermissionStatus::Denied,
                }),
            };
            let response = client.list_permissions(&query).await?;
            if response.permissions.is_empty() {
                println!("No permission requests");
            }
            for permission in &response.permissions {
                let status = format!("{:?}", permission.status).to_lowercase();
                println!(
                    "{}  {:<10}  {:<8}  stream {}",
                    permission.id,
                    permission.tool_name,
                    status,
                    format_session_id(&permission.streaming_id),
                );
            }
        }
        Command::Approve { request_id } => {
            client.approve_permission(&request_id).await?;
            println!("Approved {request_id}");
        }
        Command::Deny { request_id } => {
            client.deny_permission(&request_id).await?;
            println!("Denied {request_id}");
        }
        Command::Status => {
            let status = client.system_status().await?;
            println!("Backend:              {}", client.base_url());
            println!("CLI version:          {}", status.cli_version);
            println!("CLI path:             {}", status.cli_path);
            println!("Config path:          {}", status.config_path);
            println!("Active conversations: {}", status.active_conversations);
        }
        Command::Models => {
            let response = client.models().await?;
            for model in &response.models {
                let marker = if *model == response.default_model { "*" } else { " " };
                println!("{marker} {model}  ({})", format_model_name(model));
            }
        }
    }
    Ok(())
}

async fn watch_stream(
    config: &Config,
    client: ApiClient,
    streaming_id: String,
    session_id: Option<String>,
) -> Result<()> {
    let settings = Arc::new(JsonFileSettings::new(config.settings_path.clone()));
    let mut app = WatchApp::new(
        config,
        client,
        settings,
        WatchOptions {
            streaming_id,
            session_id,
        },
    )?;
    app.run().await
}
