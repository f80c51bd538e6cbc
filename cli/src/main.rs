use std::collections::HashMap;
use std::io::Read;
use algo_common::{program, state, group, Account};
use algo_common::program::contract::{Contract, ContractCollection};
use base64::Engine;

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

fn parse_values(args: std::env::ArgsOs) -> HashMap<String, u64> {
    args.map(|arg| {
        let arg = arg.into_string().expect("variable assignment is not UTF-8");
        let mut parts = arg.splitn(2, '=');
        let name = parts.next().expect("splitn returns at least one item");
        let value = parts.next()
            .unwrap_or_else(|| panic!("missing value of variable \"{}\", the format is name=value", name))
            .parse::<u64>()
            .unwrap_or_else(|error| panic!("invalid value of variable \"{}\": {}", name, error));
        (name.to_lowercase(), value)
    })
    .collect()
}

fn instantiate(mut args: std::env::ArgsOs) {
    let file = args.next().expect("missing contract collection file");
    let json = std::fs::read_to_string(&file).expect("failed to read contract collection");
    let collection = ContractCollection::from_json(&json).expect("invalid contract collection");
    let name = args.next()
        .expect("missing contract name")
        .into_string()
        .expect("contract name is not UTF-8");
    let contract = collection.get(&name).unwrap_or_else(|| panic!("unknown contract \"{}\"", name));

    match contract {
        Contract::App(contract) => {
            let which = args.next()
                .expect("missing program (approval, clear)")
                .into_string()
                .expect("unrecognized program");
            let logic = match &*which {
                "approval" => &contract.approval_program,
                "clear" => &contract.clear_program,
                _ => panic!("unknown program \"{}\"", which),
            };
            let values = parse_values(args);
            let bytes = logic.instantiate(&values).expect("failed to instantiate program");
            println!("{}", BASE64.encode(bytes));
        },
        Contract::LogicSig(contract) => {
            let values = parse_values(args);
            let logic_sig = contract.logic_sig(&values, Vec::new()).expect("failed to instantiate program");
            println!("{}", BASE64.encode(logic_sig.program()));
            println!("address: {}", logic_sig.address());
        },
    }
}

fn encode_varint(mut args: std::env::ArgsOs) {
    let value = args.next()
        .expect("missing number")
        .into_string()
        .expect("number is not UTF-8")
        .parse::<u64>()
        .expect("invalid number");

    for byte in program::encode_integer(value) {
        print!("{:02x}", byte);
    }
    println!();
}

fn key(mut args: std::env::ArgsOs) {
    let command = args.next()
        .expect("missing key subcommand (generate, address)")
        .into_string()
        .expect("unrecognized key subcommand");

    match &*command {
        "generate" => {
            let account = Account::generate();
            println!("private key: {}", BASE64.encode(account.seed()));
            println!("address: {}", account.address());
        },
        "address" => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).expect("failed to read private key from stdin");
            if buf.last() == Some(&b'\n') {
                buf.pop();
            }
            let bytes = BASE64.decode(buf).expect("failed to decode the base64 private key");
            let account = Account::from_private_key(&bytes).expect("invalid private key");
            println!("{}", account.address());
        },
        _ => panic!("unknown key subcommand \"{}\"", command),
    }
}

fn state_key(mut args: std::env::ArgsOs) {
    let kind = args.next()
        .expect("missing key type (number, string)")
        .into_string()
        .expect("unrecognized key type");
    let key = args.next()
        .expect("missing key")
        .into_string()
        .expect("key is not UTF-8");

    match &*kind {
        "number" => println!("{}", state::encode_number_key(key.parse().expect("invalid number"))),
        "string" => println!("{}", state::encode_key(&key)),
        _ => panic!("unknown key type \"{}\"", kind),
    }
}

/// Splits a base64-encoded group read from stdin into its transactions.
fn split() {
    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf).expect("failed to read transaction group from stdin");
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    let bytes = BASE64.decode(buf).expect("failed to decode the base64 transaction group");
    let transactions = group::split_wire(&bytes).expect("invalid transaction group encoding");
    for transaction in transactions {
        println!("{}", BASE64.encode(transaction));
    }
}

fn main() {
    let mut args = std::env::args_os();
    let _program_name = args.next().expect("missing program name");
    let command = args.next()
        .expect("missing subcommand (program, varint, key, state-key, split)")
        .into_string()
        .expect("unrecognized command");

    match &*command {
        "program" => instantiate(args),
        "varint" => encode_varint(args),
        "key" => key(args),
        "state-key" => state_key(args),
        "split" => split(),
        _ => panic!("unknown command \"{}\"", command),
    }
}
