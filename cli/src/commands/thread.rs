// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::Subcommand;
use colored::Colorize;

use agentnet_sdk::{
    AgentNetworkClient, GetMessagesRequest, MessageInfo, MessageToolCall, ThreadInfo,
};

use super::parse_key_value;

#[derive(Subcommand)]
pub enum ThreadCommand {
    /// Create a thread
    Create {
        /// Participant name, repeatable
        #[arg(short, long = "participant", value_name = "NAME", required = true)]
        participants: Vec<String>,

        #[arg(short, long, default_value = "")]
        instruction: String,

        /// Metadata entry, repeatable
        #[arg(long = "metadata", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },

    /// List threads
    List {
        /// Page size used while paging through the service
        #[arg(long, default_value_t = 100)]
        page_size: u32,

        #[arg(long)]
        json: bool,
    },

    /// Show one thread
    Show {
        #[arg(value_name = "THREAD_ID")]
        thread_id: u32,

        #[arg(long)]
        json: bool,
    },

    /// Print the messages of a thread
    Messages {
        #[arg(value_name = "THREAD_ID")]
        thread_id: u32,

        /// oldest | latest
        #[arg(long, default_value = "oldest")]
        order: String,

        /// Start strictly after this message id (0 = from the beginning)
        #[arg(long, default_value_t = 0)]
        cursor: u32,

        #[arg(long)]
        json: bool,
    },

    /// Post a message to a thread; write @name to mention a participant
    Post {
        #[arg(value_name = "THREAD_ID")]
        thread_id: u32,

        #[arg(long)]
        sender: String,

        #[arg(value_name = "CONTENT")]
        content: String,

        /// Tool call as NAME=ARGUMENTS_JSON, repeatable
        #[arg(long = "tool-call", value_name = "NAME=JSON", value_parser = parse_key_value)]
        tool_calls: Vec<(String, String)>,
    },

    /// Add an agent to a thread's participants
    Invite {
        #[arg(value_name = "THREAD_ID")]
        thread_id: u32,

        #[arg(value_name = "AGENT")]
        agent: String,
    },
}

pub async fn handle_command(command: ThreadCommand, client: &AgentNetworkClient) -> Result<()> {
    match command {
        ThreadCommand::Create {
            participants,
            instruction,
            metadata,
        } => {
            let id = client
                .create_thread(&instruction, participants, metadata.into_iter().collect())
                .await
                .context("Failed to create thread")?;
            println!("{}", format!("✓ Created thread #{}", id).green());
            Ok(())
        }
        ThreadCommand::List { page_size, json } => {
            let threads = client
                .get_all_threads(page_size)
                .await
                .context("Failed to list threads")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&threads)?);
                return Ok(());
            }
            if threads.is_empty() {
                println!("{}", "No threads found".yellow());
                return Ok(());
            }
            println!("{:<8} {:<20} {:<32} {}", "ID", "CREATED", "PARTICIPANTS", "INSTRUCTION");
            for thread in &threads {
                println!(
                    "{:<8} {:<20} {:<32} {}",
                    thread.id,
                    local_time(thread.created_at),
                    thread.participants.join(","),
                    first_line(&thread.instruction)
                );
            }
            Ok(())
        }
        ThreadCommand::Show { thread_id, json } => {
            let thread = client
                .get_thread(thread_id)
                .await
                .with_context(|| format!("Failed to fetch thread {}", thread_id))?;
            let count = client
                .get_num_messages(thread_id)
                .await
                .with_context(|| format!("Failed to count messages of thread {}", thread_id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&thread)?);
            } else {
                print_thread(&thread, count);
            }
            Ok(())
        }
        ThreadCommand::Messages {
            thread_id,
            order,
            cursor,
            json,
        } => {
            let page = client
                .get_messages(GetMessagesRequest {
                    thread_id,
                    order,
                    limit: 0,
                    cursor,
                })
                .await
                .with_context(|| format!("Failed to fetch messages of thread {}", thread_id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
                return Ok(());
            }
            if page.messages.is_empty() {
                println!("{}", "No messages".yellow());
                return Ok(());
            }
            for message in &page.messages {
                print_message(message);
            }
            println!("{}", format!("next cursor: {}", page.next_cursor).dimmed());
            Ok(())
        }
        ThreadCommand::Post {
            thread_id,
            sender,
            content,
            tool_calls,
        } => {
            let tool_calls = tool_calls
                .into_iter()
                .map(|(name, arguments)| tool_call(name, arguments))
                .collect::<Result<Vec<_>>>()?;
            let id = client
                .add_message(thread_id, &sender, &content, tool_calls)
                .await
                .with_context(|| format!("Failed to post to thread {}", thread_id))?;
            println!("{}", format!("✓ Posted message #{} to thread #{}", id, thread_id).green());
            Ok(())
        }
        ThreadCommand::Invite { thread_id, agent } => {
            client
                .invite(thread_id, &agent)
                .await
                .with_context(|| format!("Failed to invite {} to thread {}", agent, thread_id))?;
            println!("{}", format!("✓ Invited {} to thread #{}", agent, thread_id).green());
            Ok(())
        }
    }
}

/// Tool call from the command line; `arguments` must already be JSON.
fn tool_call(name: String, arguments: String) -> Result<MessageToolCall> {
    if let Err(e) = serde_json::from_str::<serde_json::Value>(&arguments) {
        bail!("tool call {} arguments are not valid JSON: {}", name, e);
    }
    Ok(MessageToolCall {
        name,
        arguments,
        result: String::new(),
    })
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

fn print_thread(thread: &ThreadInfo, message_count: u32) {
    println!("{}", format!("Thread #{}", thread.id).bold());
    println!("  Created: {}", local_time(thread.created_at));
    println!("  Updated: {}", local_time(thread.updated_at));
    println!("  Participants: {}", thread.participants.join(", "));
    println!("  Messages: {}", message_count);
    if !thread.instruction.is_empty() {
        println!("  Instruction:");
        for line in thread.instruction.lines() {
            println!("    {}", line);
        }
    }
}

fn print_message(message: &MessageInfo) {
    println!(
        "{} {} {}",
        format!("#{}", message.id).dimmed(),
        message.sender.bold(),
        local_time(message.created_at).dimmed()
    );
    if !message.content.is_empty() {
        println!("  {}", message.content);
    }
    for call in &message.tool_calls {
        println!("  {} {}({})", "tool".cyan(), call.name, call.arguments);
        if !call.result.is_empty() {
            println!("    → {}", call.result);
        }
    }
}
