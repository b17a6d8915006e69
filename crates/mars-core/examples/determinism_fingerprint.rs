//! Deterministic battle fingerprint generator used for cross-host comparison.

use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use mars_core::{Battle, MarsConfig, Outcome};
use redcode::{parse_warrior, PackedInstruction, ParseOptions};

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn fingerprint() -> String {
    let options = ParseOptions::default();
    let dwarf = parse_warrior(
        "ADD.AB #4, $3\nMOV.I $2, @2\nJMP.B $-2, $0\nDAT.F #0, #0\nEND\n",
        &options,
    )
    .expect("dwarf parses");
    let imp = parse_warrior("MOV.I $0, $1\nEND\n", &options).expect("imp parses");

    let config = MarsConfig::default();
    let mut battle =
        Battle::new(config, &[dwarf, imp], &[0, 4000]).expect("fingerprint battle sets up");
    let outcome = battle.run(config.cycles_before_tie + 1);

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    hash_bytes(&mut hash, &battle.cycles().to_le_bytes());

    match outcome {
        Outcome::Win(index) => {
            hash_bytes(&mut hash, &[0x10]);
            hash_bytes(&mut hash, &(index as u64).to_le_bytes());
        }
        Outcome::Tie => hash_bytes(&mut hash, &[0x11]),
        Outcome::Paused => hash_bytes(&mut hash, &[0x12]),
    }

    for cell in battle.core().cells() {
        let packed = PackedInstruction::from_instruction(*cell);
        hash_bytes(&mut hash, &packed.word.to_le_bytes());
        hash_bytes(&mut hash, &packed.a_field.to_le_bytes());
        hash_bytes(&mut hash, &packed.b_field.to_le_bytes());
    }
    for warrior in 0..2 {
        for pc in battle.tasks(warrior) {
            hash_bytes(&mut hash, &pc.to_le_bytes());
        }
    }

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
