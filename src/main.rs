use clap::Parser;
use data_encoding::HEXLOWER;
use log::{error, LevelFilter};
use powledger::{Block, Blockchain, Command, Opt, ProofOfWork, Transaction, UTXOSet};
use std::process;

fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    // clap prints usage and exits non-zero on unknown commands
    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

// Each arm opens the ledger once; the handle is dropped (and the store released) when the arm
// ends, on the error path included.
fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Createblockchain { address } => {
            Blockchain::create(&address)?;
            println!("Done!");
        }
        Command::GetBalance { address } => {
            let blockchain = Blockchain::open()?;
            let balance = UTXOSet::new(&blockchain).get_balance(&address)?;
            println!("Balance of '{address}': {balance}");
        }
        Command::Send { from, to, amount } => {
            if amount == 0 {
                return Err("Amount must be positive".into());
            }
            let mut blockchain = Blockchain::open()?;
            let transaction = {
                let utxo_set = UTXOSet::new(&blockchain);
                Transaction::new_utxo_transaction(&from, &to, amount, &utxo_set)?
            };
            blockchain.mine_block(&[transaction])?;
            println!("Success!");
        }
        Command::Printchain => {
            let blockchain = Blockchain::open()?;
            for block in blockchain.iterator() {
                print_block(&block?);
            }
        }
        Command::PrintUtxo { address } => {
            let blockchain = Blockchain::open()?;
            for utx in UTXOSet::new(&blockchain).find_unspent_transactions(&address)? {
                print_transaction(utx.get_transaction());
                let indices: Vec<String> = utx
                    .get_output_indices()
                    .iter()
                    .map(|idx| idx.to_string())
                    .collect();
                println!("Unspent outputs: {}", indices.join(", "));
                println!();
            }
        }
    }
    Ok(())
}

fn print_block(block: &Block) {
    println!("Prev. hash: {}", HEXLOWER.encode(block.get_pre_block_hash()));
    println!("Hash: {}", block.get_hash_hex());
    println!("Timestamp: {}", block.get_timestamp());
    println!("Nonce: {}", block.get_nonce());
    println!("Transactions:");
    for tx in block.get_transactions() {
        print_transaction(tx);
    }
    println!("PoW: {}", ProofOfWork::validate(block));
    println!();
}

fn print_transaction(tx: &Transaction) {
    println!("- Transaction ID: {}", HEXLOWER.encode(tx.get_id()));
    for input in tx.get_vin() {
        if tx.is_coinbase() {
            println!("-- Coinbase: {}", input.get_script_sig());
        } else {
            println!(
                "-- Input txid = {}, vout = {}, from = {}",
                HEXLOWER.encode(input.get_txid()),
                input.get_vout(),
                input.get_script_sig()
            );
        }
    }
    for output in tx.get_vout() {
        println!(
            "-- Output value = {}, to = {}",
            output.get_value(),
            output.get_script_pub_key()
        );
    }
}
