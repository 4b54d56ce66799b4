//! vcpu-emu - CLI Entry Point
//!
//! Commands:
//! - `vcpu-emu alu <op> <a> <b>` - Evaluate one ALU operation
//! - `vcpu-emu push <size> <values>...` - Push values onto a fresh stack
//! - `vcpu-emu regs` - Show the register file after reset

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use vcpu::register::{Flag, STACK_SIZE};
use vcpu::{AluOp, GeneralRegister, OperandSize, RegisterFile, Stack, StackError, StatusWord};

#[derive(Parser)]
#[command(name = "vcpu-emu")]
#[command(version = "0.1.0")]
#[command(about = "Register file, status word, stack and integer ALU of a 64-bit virtual CPU")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one ALU operation and show the result and flags
    Alu {
        /// Operation to perform
        #[arg(value_enum)]
        op: OpArg,
        /// Target register value (hex 0x.., binary 0b.., or signed decimal)
        #[arg(value_parser = parse_number, allow_negative_numbers = true)]
        a: u64,
        /// Operand register value
        #[arg(value_parser = parse_number, allow_negative_numbers = true)]
        b: u64,
        /// Operand size in bits (8, 16, 32 or 64)
        #[arg(short, long, default_value = "64", value_parser = parse_size)]
        size: OperandSize,
        /// Set the carry flag before the operation
        #[arg(short, long)]
        carry: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push values onto a fresh 64 KiB stack
    Push {
        /// Width of each value in bits (8, 16, 32 or 64)
        #[arg(value_parser = parse_size)]
        size: OperandSize,
        /// Values to push, in order
        #[arg(required = true, value_parser = parse_number, allow_negative_numbers = true)]
        values: Vec<u64>,
        /// Initial stack pointer
        #[arg(short, long, default_value = "0xFFFF", value_parser = parse_number)]
        pointer: u64,
        /// Pop every value back off afterwards
        #[arg(long)]
        pop: bool,
    },
    /// Show the register file after reset
    Regs {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OpArg {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Cmp,
    Shl,
    Shr,
    Sra,
    Mul,
    Div,
}

impl From<OpArg> for AluOp {
    fn from(op: OpArg) -> Self {
        match op {
            OpArg::Add => AluOp::Add,
            OpArg::Sub => AluOp::Subtract,
            OpArg::And => AluOp::And,
            OpArg::Or => AluOp::Or,
            OpArg::Xor => AluOp::Xor,
            OpArg::Cmp => AluOp::Compare,
            OpArg::Shl => AluOp::ShiftLeft,
            OpArg::Shr => AluOp::ShiftRight,
            OpArg::Sra => AluOp::ShiftRightArithmetic,
            OpArg::Mul => AluOp::MultiplySigned,
            OpArg::Div => AluOp::DivideSigned,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Alu { op, a, b, size, carry, json }) => {
            run_alu(op.into(), a, b, size, carry, json);
        }
        Some(Commands::Push { size, values, pointer, pop }) => {
            run_push(size, &values, pointer, pop);
        }
        Some(Commands::Regs { json }) => {
            show_registers(json);
        }
        None => {
            println!("vcpu-emu v0.1.0");
            println!("Register core of a 64-bit virtual CPU");
            println!();
            println!("Use --help for available commands");
            println!();
            demo();
        }
    }
}

/// Parse `0x..` hex, `0b..` binary, or signed decimal into a raw 64-bit pattern.
fn parse_number(s: &str) -> Result<u64, String> {
    let s = s.trim().replace('_', "");
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        u64::from_str_radix(bin, 2)
    } else if s.starts_with('-') {
        s.parse::<i64>().map(|v| v as u64)
    } else {
        s.parse::<u64>()
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}

fn parse_size(s: &str) -> Result<OperandSize, String> {
    match s.trim() {
        "8" => Ok(OperandSize::Operand8),
        "16" => Ok(OperandSize::Operand16),
        "32" => Ok(OperandSize::Operand32),
        "64" => Ok(OperandSize::Operand64),
        other => Err(format!("size must be 8, 16, 32 or 64, got '{}'", other)),
    }
}

#[derive(Serialize)]
struct AluReport {
    op: AluOp,
    bits: u32,
    result: GeneralRegister,
    operand: GeneralRegister,
    status: StatusWord,
    carry: bool,
    overflow: bool,
    zero: bool,
    negative: bool,
}

fn run_alu(op: AluOp, a: u64, b: u64, size: OperandSize, carry: bool, json: bool) {
    let mut st = StatusWord::new();
    st.set_operand_size(size);
    st.assign_flag(Flag::Carry, carry);

    let mut target = GeneralRegister::new(a);
    let mut operand = GeneralRegister::new(b);
    if let Err(e) = target.apply(op, &mut operand, &mut st) {
        eprintln!("❌ {:?}: {}", op, e);
        std::process::exit(1);
    }

    let report = AluReport {
        op,
        bits: size.bits_wide(),
        result: target,
        operand,
        status: st,
        carry: st.carry(),
        overflow: st.overflow(),
        zero: st.zero(),
        negative: st.negative(),
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("❌ Failed to serialize: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("{:?} {:#X}, {:#X} ({}-bit)", op, a, b, report.bits);
    println!("  result  = {} ({})", target, target.int64());
    println!("  operand = {} ({})", operand, operand.int64());
    println!("  {:?}", st);
}

fn run_push(size: OperandSize, values: &[u64], pointer: u64, pop: bool) {
    let pointer = match u16::try_from(pointer) {
        Ok(p) => p,
        Err(_) => {
            eprintln!("❌ Stack pointer {:#X} does not fit in 16 bits", pointer);
            std::process::exit(1);
        }
    };

    let mut memory = vec![0u8; STACK_SIZE];
    let mut stack = match Stack::new(&mut memory, pointer) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let width = size.bits_wide() / 8;
    for &value in values {
        let pushed = match size {
            OperandSize::Operand8 => stack.push8(value as u8),
            OperandSize::Operand16 => stack.push16(value as u16),
            OperandSize::Operand32 => stack.push32(value as u32),
            OperandSize::Operand64 => stack.push64(value),
        };
        if let Err(e) = pushed {
            eprintln!("❌ push {:#X}: {}", value, e);
            break;
        }
        let start = (stack.pointer() + 1) as usize;
        let bytes: Vec<String> = stack.memory()[start..start + width as usize]
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect();
        println!("push {:#X}: ptr={} [{}]", value, stack.pointer(), bytes.join(" "));
    }

    if pop {
        loop {
            let popped: Result<u64, StackError> = match size {
                OperandSize::Operand8 => stack.pop8().map(u64::from),
                OperandSize::Operand16 => stack.pop16().map(u64::from),
                OperandSize::Operand32 => stack.pop32().map(u64::from),
                OperandSize::Operand64 => stack.pop64(),
            };
            match popped {
                Ok(value) => println!("pop  {:#X}: ptr={}", value, stack.pointer()),
                Err(StackError::Underflow { .. }) => break,
                Err(e) => {
                    eprintln!("❌ {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    println!("depth {} bytes, {} free", stack.depth(), stack.available());
}

fn show_registers(json: bool) {
    let regs = RegisterFile::new();

    if json {
        match serde_json::to_string_pretty(&regs) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("❌ Failed to serialize: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    for (i, r) in regs.general.iter().enumerate() {
        println!("R{}   = {}", i, r);
    }
    for i in 0..2 {
        println!(
            "PTR{} = {:08X}  OFS{} = {:04X}  IX{} = {:04X}  IS{} = {:04X}",
            i, regs.pointers[i], i, regs.offsets[i], i, regs.indexes[i], i, regs.index_steps[i]
        );
    }
    for i in 0..2 {
        println!("CTR{} = {:08X}  CS{} = {:04X}", i, regs.counters[i], i, regs.counter_steps[i]);
    }
    println!("PC   = {:08X}", regs.pc);
    println!("SB   = {:08X}", regs.stack_base);
    println!("SP   = {:04X}", regs.stack_pointer);
    println!("{:?}", regs.status());
}

fn demo() {
    println!("━━━ ALU demo (8-bit) ━━━");
    let mut st = StatusWord::new();

    let mut r0 = GeneralRegister::default();
    let r1 = GeneralRegister::new(1);
    r0.set_uint8(0x7F);
    r0.add(r1, &mut st);
    println!("0x7F + 1      = {} {:?}", r0, st);

    let mut r0 = GeneralRegister::default();
    r0.set_uint8(0x85);
    r0.shift_right_arithmetic(GeneralRegister::new(2), &mut st);
    println!("0x85 >>> 2    = {} {:?}", r0, st);

    let mut r0 = GeneralRegister::default();
    let mut r1 = GeneralRegister::new(2);
    r0.set_uint8(0xF9);
    if r0.divide_signed(&mut r1, &mut st).is_ok() {
        println!("-7 / 2        = {} rem {} {:?}", r0, r1, st);
    }
}
