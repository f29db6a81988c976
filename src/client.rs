use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::{mpsc::Sender, oneshot},
};

use crate::consensus::{
    block::Transaction,
    peers::{NodeId, Peers},
    processor::{Command, Event, NodeView},
};

const MENU: &str =
    "Enter 1 (moneyTransfer), 2 (printBlockchain), 3 (printBalance), 4 (printSet) or 5 (restartRound): ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Expected three arguments. Usage: server1 server2 amount")]
    ArgumentCount,
    #[error("{0} is not a valid server. Usage: server1 server2 amount")]
    UnknownParty(String),
    #[error("{0} is not a valid amount. Usage: server1 server2 amount")]
    Amount(String),
    #[error("input should be 1, 2, 3, 4 or 5")]
    MenuChoice,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("node stopped")]
    NodeStopped,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parses `from to amount`, checking both parties against the node table.
pub fn parse_transaction(line: &str, peers: &Peers) -> Result<Transaction, InputError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [from, to, amount] = fields.as_slice() else {
        return Err(InputError::ArgumentCount);
    };
    for party in [from, to] {
        if !peers.is_member(party) {
            return Err(InputError::UnknownParty(party.to_string()));
        }
    }
    let amount: i64 = amount
        .parse()
        .map_err(|_| InputError::Amount(amount.to_string()))?;
    Ok(Transaction::new(*from, *to, amount))
}

/// Interactive front end; every action goes to the processor as a command.
pub struct Client {
    pub id: NodeId,
    pub peers: Peers,
    pub event_tx: Sender<Event>,
}

impl Client {
    pub fn new(id: NodeId, peers: Peers, event_tx: Sender<Event>) -> Self {
        Client { id, peers, event_tx }
    }

    /// Runs the menu until stdin closes.
    pub async fn run(&self) -> Result<(), ClientError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            prompt(MENU).await?;
            let Some(choice) = lines.next_line().await? else {
                println!("Goodbye!");
                return Ok(());
            };

            match choice.trim() {
                "1" => {
                    prompt("Enter a transaction: ").await?;
                    let Some(line) = lines.next_line().await? else {
                        return Ok(());
                    };
                    match parse_transaction(&line, &self.peers) {
                        Ok(tx) => self.command(Command::Submit(tx)).await?,
                        Err(err) => println!("{}", err),
                    }
                }
                "2" => {
                    for block in self.snapshot().await?.chain {
                        println!("{}", block);
                    }
                }
                "3" => {
                    let view = self.snapshot().await?;
                    let balance = view.wallets.get(&self.id).copied().unwrap_or_default();
                    println!("Server {}: {}", self.id, balance);
                }
                "4" => {
                    let pending: Vec<String> = self.snapshot().await?.pending.iter().map(|tx| tx.to_string()).collect();
                    println!("[{}]", pending.join(", "));
                }
                "5" => self.command(Command::RestartRound).await?,
                "" => {}
                _ => println!("{}", InputError::MenuChoice),
            }
        }
    }

    async fn command(&self, command: Command) -> Result<(), ClientError> {
        self.event_tx
            .send(Event::Command(command))
            .await
            .map_err(|_| ClientError::NodeStopped)
    }

    async fn snapshot(&self) -> Result<NodeView, ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command(Command::Snapshot(reply_tx)).await?;
        reply_rx.await.map_err(|_| ClientError::NodeStopped)
    }
}

async fn prompt(text: &str) -> Result<(), ClientError> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
