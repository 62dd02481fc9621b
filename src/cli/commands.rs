use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "powledger", about = "Single-node proof-of-work ledger")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    #[command(
        name = "createblockchain",
        about = "Create a blockchain and send the genesis block reward to ADDRESS"
    )]
    Createblockchain {
        #[arg(help = "The address to send genesis block reward to")]
        address: String,
    },
    #[command(name = "getbalance", about = "Get balance of ADDRESS")]
    GetBalance {
        #[arg(help = "The address to get balance for")]
        address: String,
    },
    #[command(name = "send", about = "Send AMOUNT of coins from FROM address to TO")]
    Send {
        #[arg(help = "Source address")]
        from: String,
        #[arg(help = "Destination address")]
        to: String,
        #[arg(help = "Amount to send")]
        amount: u64,
    },
    #[command(name = "printchain", about = "Print all the blocks of the blockchain")]
    Printchain,
    #[command(
        name = "printutxo",
        about = "Print the transactions holding unspent outputs of ADDRESS"
    )]
    PrintUtxo {
        #[arg(help = "The address to list unspent outputs for")]
        address: String,
    },
}
