//! Running commands over an accepted session.

use std::io::Write as _;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use tank_core::transport::Transport;
use tank_core::wire::SessionId;
use tank_services::client::request;
use tank_services::command::{Command, CommandTable};

use super::panel::Snapshot;

const DISCONNECT: &str = "disconnect";

/// The server sends no reply to a line it reads as `disconnect`, so the
/// client has to recognize those lines the same way.
fn is_disconnect(commands: &CommandTable, line: &str) -> bool {
    matches!(commands.parse(line), Some(Ok(Command::Disconnect)))
}

/// Send `line`, print the reply, then end the session.
pub async fn one_shot<T: Transport>(transport: &mut T, line: &str) -> Result<()> {
    let commands = CommandTable::new();
    if is_disconnect(&commands, line) {
        transport.write(line.as_bytes()).await?;
        return Ok(());
    }
    let reply = request(transport, line).await.context("command failed")?;
    println!("{reply}");
    transport.write(DISCONNECT.as_bytes()).await?;
    Ok(())
}

/// Prompt loop on stdin. EOF disconnects.
pub async fn interactive<T: Transport>(
    transport: &mut T,
    tank: usize,
    session_id: SessionId,
) -> Result<()> {
    let commands = CommandTable::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_panel(transport, tank, session_id).await?;
    println!("type \"help\" for the command list");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            transport.write(DISCONNECT.as_bytes()).await?;
            println!();
            return Ok(());
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if is_disconnect(&commands, line) {
            transport.write(line.as_bytes()).await?;
            return Ok(());
        }
        let reply = request(transport, line).await.context("command failed")?;
        println!("% {reply} %");
        print_panel(transport, tank, session_id).await?;
    }
}

async fn print_panel<T: Transport>(
    transport: &mut T,
    tank: usize,
    session_id: SessionId,
) -> Result<()> {
    let snapshot = Snapshot::fetch(transport)
        .await
        .context("failed to read tank status")?;
    print!("{}", snapshot.render(tank, session_id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_is_recognized_like_the_server_does() {
        let commands = CommandTable::new();
        assert!(is_disconnect(&commands, "disconnect"));
        assert!(is_disconnect(&commands, "ok, disconnect now"));
        assert!(!is_disconnect(&commands, "help disconnect"));
        assert!(!is_disconnect(&commands, "get working state"));
    }
}
