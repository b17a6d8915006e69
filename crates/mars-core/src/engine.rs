//! The per-cycle execution pipeline.
//!
//! One dispatch runs, in order: fetch (a cached copy of the current
//! instruction), A-operand evaluation, B-operand evaluation, opcode
//! dispatch, then the deferred post-increment commit. Predecrement side
//! effects land in the core immediately and are visible to every later
//! read in the same cycle; post-increments are recorded during evaluation
//! and applied only at commit, so a second evaluation in the same cycle
//! observes pre-increment values.

use redcode::{AddrMode, Field, Instruction, Modifier, Opcode};

use crate::core::Core;
use crate::pspace::PSpaceSet;
use crate::scheduler::Scheduler;

/// Core addresses whose fields are incremented when the cycle commits.
///
/// Strictly intra-cycle state: both lists must be empty at every cycle
/// boundary. Each list holds at most two entries (one per operand
/// evaluation), so the backing storage never reallocates after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub(crate) struct DeferredIncrements {
    a_fields: Vec<Field>,
    b_fields: Vec<Field>,
}

impl DeferredIncrements {
    pub(crate) fn new() -> Self {
        Self {
            a_fields: Vec::with_capacity(2),
            b_fields: Vec::with_capacity(2),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.a_fields.is_empty() && self.b_fields.is_empty()
    }

    fn note_a(&mut self, addr: Field) {
        self.a_fields.push(addr);
    }

    fn note_b(&mut self, addr: Field) {
        self.b_fields.push(addr);
    }

    /// Applies and clears all recorded increments.
    fn commit(&mut self, core: &mut Core) {
        let size = core.size();
        for &addr in &self.a_fields {
            let cell = core.get_mut(addr);
            cell.a_field = (cell.a_field + 1).rem_euclid(size);
        }
        for &addr in &self.b_fields {
            let cell = core.get_mut(addr);
            cell.b_field = (cell.b_field + 1).rem_euclid(size);
        }
        self.a_fields.clear();
        self.b_fields.clear();
    }
}

/// A resolved operand: the effective address and a snapshot of the cell it
/// names, taken after any predecrement side effects.
#[derive(Debug, Clone, Copy)]
struct Operand {
    ptr: Field,
    insn: Instruction,
}

/// Executes one task of `warrior` whose program counter is `pc`.
///
/// The caller has already popped `pc` from the warrior's queue; this
/// function enqueues the continuation (zero, one, or two tasks) and
/// commits the cycle's deferred post-increments before returning.
pub(crate) fn step(
    core: &mut Core,
    sched: &mut Scheduler,
    pspace: Option<&mut PSpaceSet>,
    deferred: &mut DeferredIncrements,
    warrior: usize,
    pc: Field,
) {
    debug_assert!(deferred.is_empty(), "increments crossed a cycle boundary");
    debug_assert!(core.in_range(pc), "unfolded program counter {pc}");

    // Later writes to core[pc] must not affect this cycle's decoding.
    let instr = core.get(pc);

    let a = evaluate(core, deferred, pc, instr.a_mode, instr.a_field);
    let b = evaluate(core, deferred, pc, instr.b_mode, instr.b_field);

    execute(core, sched, pspace, warrior, pc, instr, a, b);

    deferred.commit(core);
}

/// Resolves one operand. A postincrement target lands in the deferred list
/// of the field it bumps, regardless of which operand recorded it.
fn evaluate(
    core: &mut Core,
    deferred: &mut DeferredIncrements,
    pc: Field,
    mode: AddrMode,
    field: Field,
) -> Operand {
    let ptr = match mode {
        AddrMode::Immediate => pc,
        AddrMode::Direct => core.offset(pc, field),
        AddrMode::IndirectA => {
            let target = core.offset(pc, field);
            core.offset(target, core.get(target).a_field)
        }
        AddrMode::IndirectB => {
            let target = core.offset(pc, field);
            core.offset(target, core.get(target).b_field)
        }
        AddrMode::PredecA => {
            let target = core.offset(pc, field);
            let size = core.size();
            let cell = core.get_mut(target);
            cell.a_field = (cell.a_field - 1).rem_euclid(size);
            let secondary = cell.a_field;
            core.offset(target, secondary)
        }
        AddrMode::PredecB => {
            let target = core.offset(pc, field);
            let size = core.size();
            let cell = core.get_mut(target);
            cell.b_field = (cell.b_field - 1).rem_euclid(size);
            let secondary = cell.b_field;
            core.offset(target, secondary)
        }
        AddrMode::PostincA => {
            let target = core.offset(pc, field);
            deferred.note_a(target);
            core.offset(target, core.get(target).a_field)
        }
        AddrMode::PostincB => {
            let target = core.offset(pc, field);
            deferred.note_b(target);
            core.offset(target, core.get(target).b_field)
        }
    };

    Operand {
        ptr,
        insn: core.get(ptr),
    }
}

#[allow(clippy::too_many_arguments)]
fn execute(
    core: &mut Core,
    sched: &mut Scheduler,
    pspace: Option<&mut PSpaceSet>,
    warrior: usize,
    pc: Field,
    instr: Instruction,
    a: Operand,
    b: Operand,
) {
    let next = core.offset(pc, 1);
    let skip = core.offset(pc, 2);

    match instr.opcode {
        // The task queued nothing: its process dies here.
        Opcode::Dat => {}
        Opcode::Nop => sched.spawn(warrior, next),
        Opcode::Mov => {
            exec_mov(core, instr.modifier, a, b);
            sched.spawn(warrior, next);
        }
        Opcode::Add | Opcode::Sub | Opcode::Mul => {
            exec_arith(core, instr.opcode, instr.modifier, a, b);
            sched.spawn(warrior, next);
        }
        Opcode::Div | Opcode::Mod => {
            if exec_div(core, instr.opcode, instr.modifier, a, b) {
                sched.spawn(warrior, next);
            }
        }
        Opcode::Jmp => sched.spawn(warrior, a.ptr),
        Opcode::Jmz => {
            let taken = selected_all_zero(instr.modifier, b.insn);
            sched.spawn(warrior, if taken { a.ptr } else { next });
        }
        Opcode::Jmn => {
            let taken = selected_any_nonzero(instr.modifier, b.insn);
            sched.spawn(warrior, if taken { a.ptr } else { next });
        }
        Opcode::Djn => {
            let taken = exec_djn(core, instr.modifier, b.ptr);
            sched.spawn(warrior, if taken { a.ptr } else { next });
        }
        Opcode::Spl => {
            sched.spawn(warrior, next);
            sched.spawn(warrior, a.ptr);
        }
        Opcode::Slt => {
            let taken = slt_holds(instr.modifier, a.insn, b.insn);
            sched.spawn(warrior, if taken { skip } else { next });
        }
        Opcode::Seq | Opcode::Cmp => {
            let taken = values_equal(instr.modifier, a.insn, b.insn);
            sched.spawn(warrior, if taken { skip } else { next });
        }
        Opcode::Sne => {
            let taken = !values_equal(instr.modifier, a.insn, b.insn);
            sched.spawn(warrior, if taken { skip } else { next });
        }
        Opcode::Ldp => {
            exec_ldp(core, pspace, warrior, instr.modifier, a, b);
            sched.spawn(warrior, next);
        }
        Opcode::Stp => {
            exec_stp(pspace, warrior, instr.modifier, a, b);
            sched.spawn(warrior, next);
        }
    }
}

fn exec_mov(core: &mut Core, modifier: Modifier, a: Operand, b: Operand) {
    let dest = core.get_mut(b.ptr);
    match modifier {
        Modifier::A => dest.a_field = a.insn.a_field,
        Modifier::B => dest.b_field = a.insn.b_field,
        Modifier::AB => dest.b_field = a.insn.a_field,
        Modifier::BA => dest.a_field = a.insn.b_field,
        Modifier::F => {
            dest.a_field = a.insn.a_field;
            dest.b_field = a.insn.b_field;
        }
        Modifier::X => {
            dest.a_field = a.insn.b_field;
            dest.b_field = a.insn.a_field;
        }
        Modifier::I => *dest = a.insn,
    }
}

/// `lhs op rhs` with `lhs` from the B-instruction and `rhs` from the
/// A-instruction, reduced modulo the core size.
fn arith(core: &Core, op: Opcode, lhs: Field, rhs: Field) -> Field {
    match op {
        Opcode::Add => core.fold(lhs + rhs),
        Opcode::Sub => core.fold(lhs - rhs),
        Opcode::Mul => {
            let product = i128::from(lhs) * i128::from(rhs);
            product.rem_euclid(i128::from(core.size())) as Field
        }
        _ => unreachable!("arith called with {op}"),
    }
}

fn exec_arith(core: &mut Core, op: Opcode, modifier: Modifier, a: Operand, b: Operand) {
    let (a_result, b_result) = match modifier {
        Modifier::A => (Some(arith(core, op, b.insn.a_field, a.insn.a_field)), None),
        Modifier::B => (None, Some(arith(core, op, b.insn.b_field, a.insn.b_field))),
        Modifier::AB => (None, Some(arith(core, op, b.insn.b_field, a.insn.a_field))),
        Modifier::BA => (Some(arith(core, op, b.insn.a_field, a.insn.b_field)), None),
        Modifier::F | Modifier::I => (
            Some(arith(core, op, b.insn.a_field, a.insn.a_field)),
            Some(arith(core, op, b.insn.b_field, a.insn.b_field)),
        ),
        Modifier::X => (
            Some(arith(core, op, b.insn.a_field, a.insn.b_field)),
            Some(arith(core, op, b.insn.b_field, a.insn.a_field)),
        ),
    };

    let dest = core.get_mut(b.ptr);
    if let Some(value) = a_result {
        dest.a_field = value;
    }
    if let Some(value) = b_result {
        dest.b_field = value;
    }
}

/// `lhs / rhs` or `lhs % rhs`; `None` marks a division by zero.
fn div_value(op: Opcode, lhs: Field, rhs: Field) -> Option<Field> {
    if rhs == 0 {
        return None;
    }
    Some(match op {
        Opcode::Div => lhs / rhs,
        Opcode::Mod => lhs % rhs,
        _ => unreachable!("div_value called with {op}"),
    })
}

/// Division family. Returns whether the task survives: any required zero
/// divisor kills it, but a surviving pair still writes its result first.
fn exec_div(core: &mut Core, op: Opcode, modifier: Modifier, a: Operand, b: Operand) -> bool {
    let (a_result, b_result, pairs) = match modifier {
        Modifier::A => (div_value(op, b.insn.a_field, a.insn.a_field), None, 1),
        Modifier::B => (None, div_value(op, b.insn.b_field, a.insn.b_field), 1),
        Modifier::AB => (None, div_value(op, b.insn.b_field, a.insn.a_field), 1),
        Modifier::BA => (div_value(op, b.insn.a_field, a.insn.b_field), None, 1),
        Modifier::F | Modifier::I => (
            div_value(op, b.insn.a_field, a.insn.a_field),
            div_value(op, b.insn.b_field, a.insn.b_field),
            2,
        ),
        Modifier::X => (
            div_value(op, b.insn.a_field, a.insn.b_field),
            div_value(op, b.insn.b_field, a.insn.a_field),
            2,
        ),
    };

    let dest = core.get_mut(b.ptr);
    if let Some(value) = a_result {
        dest.a_field = value;
    }
    if let Some(value) = b_result {
        dest.b_field = value;
    }

    let written = usize::from(a_result.is_some()) + usize::from(b_result.is_some());
    written == pairs
}

/// `JMZ` predicate: every selected field of the B-instruction is zero.
fn selected_all_zero(modifier: Modifier, insn: Instruction) -> bool {
    match modifier {
        Modifier::A | Modifier::BA => insn.a_field == 0,
        Modifier::B | Modifier::AB => insn.b_field == 0,
        Modifier::F | Modifier::X | Modifier::I => insn.a_field == 0 && insn.b_field == 0,
    }
}

/// `JMN` predicate: any selected field of the B-instruction is non-zero.
fn selected_any_nonzero(modifier: Modifier, insn: Instruction) -> bool {
    match modifier {
        Modifier::A | Modifier::BA => insn.a_field != 0,
        Modifier::B | Modifier::AB => insn.b_field != 0,
        Modifier::F | Modifier::X | Modifier::I => insn.a_field != 0 || insn.b_field != 0,
    }
}

/// Decrements the selected field(s) of the B-target in core, then reports
/// whether any of the decremented values is non-zero.
fn exec_djn(core: &mut Core, modifier: Modifier, b_ptr: Field) -> bool {
    let size = core.size();
    let dec = |value: Field| (value - 1).rem_euclid(size);
    let cell = core.get_mut(b_ptr);
    match modifier {
        Modifier::A | Modifier::BA => {
            cell.a_field = dec(cell.a_field);
            cell.a_field != 0
        }
        Modifier::B | Modifier::AB => {
            cell.b_field = dec(cell.b_field);
            cell.b_field != 0
        }
        Modifier::F | Modifier::X | Modifier::I => {
            cell.a_field = dec(cell.a_field);
            cell.b_field = dec(cell.b_field);
            cell.a_field != 0 || cell.b_field != 0
        }
    }
}

fn slt_holds(modifier: Modifier, a: Instruction, b: Instruction) -> bool {
    match modifier {
        Modifier::A => a.a_field < b.a_field,
        Modifier::B => a.b_field < b.b_field,
        Modifier::AB => a.a_field < b.b_field,
        Modifier::BA => a.b_field < b.a_field,
        Modifier::F | Modifier::I => a.a_field < b.a_field && a.b_field < b.b_field,
        Modifier::X => a.a_field < b.b_field && a.b_field < b.a_field,
    }
}

/// `SEQ`/`SNE` comparison; `.I` compares entire instructions structurally.
fn values_equal(modifier: Modifier, a: Instruction, b: Instruction) -> bool {
    match modifier {
        Modifier::A => a.a_field == b.a_field,
        Modifier::B => a.b_field == b.b_field,
        Modifier::AB => a.a_field == b.b_field,
        Modifier::BA => a.b_field == b.a_field,
        Modifier::F => a.a_field == b.a_field && a.b_field == b.b_field,
        Modifier::X => a.a_field == b.b_field && a.b_field == b.a_field,
        Modifier::I => a == b,
    }
}

/// P-space cell index selected from the A-instruction, and the in-core
/// destination field, both by modifier. Behaves as `NOP` when p-space is
/// absent or zero-sized.
fn exec_ldp(
    core: &mut Core,
    pspace: Option<&mut PSpaceSet>,
    warrior: usize,
    modifier: Modifier,
    a: Operand,
    b: Operand,
) {
    let Some(pspace) = pspace else { return };
    if pspace.size() == 0 {
        return;
    }

    let source = match modifier {
        Modifier::A | Modifier::AB => a.insn.a_field,
        _ => a.insn.b_field,
    };
    let index = source.rem_euclid(Field::from(pspace.size()));
    let value = core.fold(pspace.load(warrior, index));

    let dest = core.get_mut(b.ptr);
    match modifier {
        Modifier::A | Modifier::BA => dest.a_field = value,
        _ => dest.b_field = value,
    }
}

fn exec_stp(
    pspace: Option<&mut PSpaceSet>,
    warrior: usize,
    modifier: Modifier,
    a: Operand,
    b: Operand,
) {
    let Some(pspace) = pspace else { return };
    if pspace.size() == 0 {
        return;
    }

    let value = match modifier {
        Modifier::A | Modifier::AB => a.insn.a_field,
        _ => a.insn.b_field,
    };
    let index_source = match modifier {
        Modifier::A | Modifier::BA => b.insn.a_field,
        _ => b.insn.b_field,
    };
    let index = index_source.rem_euclid(Field::from(pspace.size()));
    pspace.store(warrior, index, value);
}

#[cfg(test)]
mod tests {
    use redcode::{parse_warrior, Field, Instruction, ParseOptions};

    use super::{step, DeferredIncrements};
    use crate::core::Core;
    use crate::pspace::PSpaceSet;
    use crate::scheduler::Scheduler;

    const SIZE: u32 = 40;

    fn asm(line: &str) -> Instruction {
        let source = format!("{line}\n");
        parse_warrior(&source, &ParseOptions::default()).expect("test instruction")
            .code()[0]
    }

    fn core_with(cells: &[(Field, &str)]) -> Core {
        let mut core = Core::new(SIZE);
        for &(addr, line) in cells {
            let normalized = core.normalized(asm(line));
            core.set(addr, normalized);
        }
        core
    }

    fn run_one(core: &mut Core, sched: &mut Scheduler, warrior: usize, pc: Field) {
        let mut deferred = DeferredIncrements::new();
        step(core, sched, None, &mut deferred, warrior, pc);
        assert!(deferred.is_empty(), "deferred lists survived the cycle");
    }

    fn run_one_with_pspace(
        core: &mut Core,
        sched: &mut Scheduler,
        pspace: &mut PSpaceSet,
        warrior: usize,
        pc: Field,
    ) {
        let mut deferred = DeferredIncrements::new();
        step(core, sched, Some(pspace), &mut deferred, warrior, pc);
        assert!(deferred.is_empty());
    }

    fn tasks(sched: &Scheduler, warrior: usize) -> Vec<Field> {
        sched.tasks(warrior).collect()
    }

    #[test]
    fn dat_kills_the_task() {
        let mut core = core_with(&[(0, "DAT.F #0, #0")]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(sched.task_count(0), 0);
    }

    #[test]
    fn nop_advances_and_touches_nothing() {
        let mut core = core_with(&[(0, "NOP.F $5, $7")]);
        let snapshot = core.clone();
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(tasks(&sched, 0), vec![1]);
        assert_eq!(core.cells(), snapshot.cells());
    }

    #[test]
    fn mov_i_copies_the_whole_instruction() {
        let mut core = core_with(&[(0, "MOV.I $0, $1")]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(core.get(1), asm("MOV.I $0, $1"));
        assert_eq!(tasks(&sched, 0), vec![1]);
    }

    #[test]
    fn mov_field_modifiers_select_the_right_fields() {
        let source = "DAT.F $11, $22";
        let dest = "DAT.F $33, $44";
        let cases = [
            ("MOV.A $1, $2", 11, 44),
            ("MOV.B $1, $2", 33, 22),
            ("MOV.AB $1, $2", 33, 11),
            ("MOV.BA $1, $2", 22, 44),
            ("MOV.F $1, $2", 11, 22),
            ("MOV.X $1, $2", 22, 11),
        ];
        for (mov, expect_a, expect_b) in cases {
            let mut core = core_with(&[(0, mov), (1, source), (2, dest)]);
            let mut sched = Scheduler::new(1, 8);
            run_one(&mut core, &mut sched, 0, 0);
            let cell = core.get(2);
            assert_eq!((cell.a_field, cell.b_field), (expect_a, expect_b), "{mov}");
        }
    }

    #[test]
    fn immediate_operands_point_at_the_instruction_itself() {
        // MOV.AB #5, $2 writes its own A-field into cell 2's B-field.
        let mut core = core_with(&[(0, "MOV.AB #5, $2")]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(core.get(2).b_field, 5);
    }

    #[test]
    fn indirect_modes_follow_the_secondary_offset() {
        // @3 resolves through cell 3's B-field; *3 through its A-field.
        let mut core = core_with(&[
            (0, "MOV.AB #9, @3"),
            (3, "DAT.F $4, $7"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(core.get(10).b_field, 9, "3 + b-field 7 = 10");

        let mut core = core_with(&[
            (0, "MOV.AB #9, *3"),
            (3, "DAT.F $4, $7"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(core.get(7).b_field, 9, "3 + a-field 4 = 7");
    }

    #[test]
    fn predecrement_applies_before_the_pointer_is_formed() {
        let mut core = core_with(&[
            (0, "MOV.AB #7, <1"),
            (1, "DAT.F $0, $5"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(core.get(1).b_field, 4, "decrement lands in core");
        assert_eq!(core.get(5).b_field, 7, "pointer used the decremented value");
    }

    #[test]
    fn self_referential_predecrement_is_visible_in_core_not_in_the_cache() {
        // {0 decrements this cell's own A-field before use; the cached copy
        // that drives the rest of the cycle keeps its original operands.
        let mut core = core_with(&[(0, "MOV.AB {0, $3")]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);

        assert_eq!(core.get(0).a_field, SIZE as Field - 1);
        // B-pointer came from the cached field value 3, and the A-operand
        // snapshot is the fill DAT at 0 + 39 = 39.
        assert_eq!(core.get(3).b_field, 0);
        assert_eq!(tasks(&sched, 0), vec![1]);
    }

    #[test]
    fn postincrement_is_deferred_to_the_end_of_the_cycle() {
        // Both operands target cell 1 with }1: the B-operand must still see
        // the pre-increment A-field, and the commit applies both increments.
        let mut core = core_with(&[
            (0, "MOV.AB }1, }1"),
            (1, "DAT.F $2, $0"),
            (3, "NOP.F #9, #1"),
            (4, "NOP.F #8, #8"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);

        assert_eq!(core.get(1).a_field, 4, "two increments committed");
        assert_eq!(core.get(3).b_field, 9, "both pointers resolved to cell 3");
        assert_eq!(core.get(4), asm("NOP.F #8, #8"), "cell 4 untouched");
    }

    #[test]
    fn postincrement_b_variant_bumps_the_b_field() {
        let mut core = core_with(&[
            (0, "JMP.B >1, $0"),
            (1, "DAT.F $0, $6"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(core.get(1).b_field, 7);
        assert_eq!(tasks(&sched, 0), vec![7], "jump used the pre-increment value");
    }

    #[test]
    fn add_and_sub_wrap_modulo_core_size() {
        let mut core = core_with(&[
            (0, "SUB.AB #5, $1"),
            (1, "DAT.F $0, $3"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(core.get(1).b_field, 38, "3 - 5 wraps to 38");

        let mut core = core_with(&[
            (0, "ADD.AB #39, $1"),
            (1, "DAT.F $0, $3"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(core.get(1).b_field, 2, "3 + 39 wraps to 2");
    }

    #[test]
    fn mul_reduces_products_modulo_core_size() {
        let mut core = core_with(&[
            (0, "MUL.AB #13, $1"),
            (1, "DAT.F $0, $7"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(core.get(1).b_field, (7 * 13) % 40);
    }

    #[test]
    fn arith_x_crosses_the_pairs() {
        let mut core = core_with(&[
            (0, "ADD.X $1, $2"),
            (1, "DAT.F $3, $5"),
            (2, "DAT.F $10, $20"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        let cell = core.get(2);
        assert_eq!(cell.a_field, 15, "b.a + a.b");
        assert_eq!(cell.b_field, 23, "b.b + a.a");
    }

    #[test]
    fn division_by_zero_kills_the_task() {
        let mut core = core_with(&[(0, "DIV.AB #0, $1")]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(sched.task_count(0), 0);
    }

    #[test]
    fn div_f_writes_the_surviving_pair_then_dies() {
        let mut core = core_with(&[
            (0, "DIV.F $1, $2"),
            (1, "DAT.F $4, $0"),
            (2, "DAT.F $12, $9"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);

        let cell = core.get(2);
        assert_eq!(cell.a_field, 3, "12 / 4 still written");
        assert_eq!(cell.b_field, 9, "zero-divisor pair untouched");
        assert_eq!(sched.task_count(0), 0, "any zero divisor is fatal");
    }

    #[test]
    fn mod_follows_the_division_rules() {
        let mut core = core_with(&[
            (0, "MOD.AB #6, $1"),
            (1, "DAT.F $0, $25"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(core.get(1).b_field, 1);
        assert_eq!(tasks(&sched, 0), vec![1]);
    }

    #[test]
    fn jmp_queues_the_a_pointer() {
        let mut core = core_with(&[(0, "JMP.B $5, $0")]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(tasks(&sched, 0), vec![5]);
    }

    #[test]
    fn jmz_jumps_only_when_all_selected_fields_are_zero() {
        let cases = [
            ("JMZ.A $9, $1", "DAT.F $0, $5", true),
            ("JMZ.B $9, $1", "DAT.F $5, $0", true),
            ("JMZ.F $9, $1", "DAT.F $0, $5", false),
            ("JMZ.F $9, $1", "DAT.F $0, $0", true),
        ];
        for (jmz, target, taken) in cases {
            let mut core = core_with(&[(0, jmz), (1, target)]);
            let mut sched = Scheduler::new(1, 8);
            run_one(&mut core, &mut sched, 0, 0);
            let expected = if taken { vec![9] } else { vec![1] };
            assert_eq!(tasks(&sched, 0), expected, "{jmz} over {target}");
        }
    }

    #[test]
    fn jmn_jumps_when_any_selected_field_is_nonzero() {
        let cases = [
            ("JMN.F $9, $1", "DAT.F $0, $5", true),
            ("JMN.F $9, $1", "DAT.F $0, $0", false),
            ("JMN.A $9, $1", "DAT.F $0, $5", false),
        ];
        for (jmn, target, taken) in cases {
            let mut core = core_with(&[(0, jmn), (1, target)]);
            let mut sched = Scheduler::new(1, 8);
            run_one(&mut core, &mut sched, 0, 0);
            let expected = if taken { vec![9] } else { vec![1] };
            assert_eq!(tasks(&sched, 0), expected, "{jmn} over {target}");
        }
    }

    #[test]
    fn djn_decrements_in_core_then_tests_the_result() {
        let mut core = core_with(&[
            (0, "DJN.B $9, $1"),
            (1, "DAT.F $0, $2"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(core.get(1).b_field, 1);
        assert_eq!(tasks(&sched, 0), vec![9], "1 is non-zero: jump");

        let mut core = core_with(&[
            (0, "DJN.B $9, $1"),
            (1, "DAT.F $0, $1"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(core.get(1).b_field, 0);
        assert_eq!(tasks(&sched, 0), vec![1], "0 after decrement: fall through");
    }

    #[test]
    fn djn_f_decrements_both_fields_and_jumps_on_either() {
        let mut core = core_with(&[
            (0, "DJN.F $9, $1"),
            (1, "DAT.F $1, $2"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        let cell = core.get(1);
        assert_eq!((cell.a_field, cell.b_field), (0, 1));
        assert_eq!(tasks(&sched, 0), vec![9]);

        let mut core = core_with(&[
            (0, "DJN.F $9, $1"),
            (1, "DAT.F $1, $1"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(tasks(&sched, 0), vec![1], "both hit zero: fall through");
    }

    #[test]
    fn spl_queues_next_then_split_in_order() {
        let mut core = core_with(&[(0, "SPL.B $5, $0")]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(tasks(&sched, 0), vec![1, 5]);
    }

    #[test]
    fn spl_drops_excess_tasks_in_fifo_order() {
        let mut core = core_with(&[(0, "SPL.B $5, $0")]);
        let mut sched = Scheduler::new(1, 2);
        sched.spawn(0, 30);
        run_one(&mut core, &mut sched, 0, 0);
        // Queue held one task; next (1) fits, the split target is dropped.
        assert_eq!(tasks(&sched, 0), vec![30, 1]);
    }

    #[test]
    fn slt_skips_when_strictly_less() {
        let cases = [
            ("SLT.AB #3, $1", "DAT.F $0, $4", true),
            ("SLT.AB #4, $1", "DAT.F $0, $4", false),
            ("SLT.F $1, $2", "", false),
            ("SLT.X $1, $2", "", true),
        ];
        // For the F/X rows: a = (3, 5), b = (10, 4). F fails on 5 < 4; the
        // crossed X pairs are 3 < 4 and 5 < 10.
        for (slt, b_override, skip) in cases {
            let mut core = core_with(&[
                (0, slt),
                (1, "DAT.F $3, $5"),
                (2, "DAT.F $10, $4"),
            ]);
            if !b_override.is_empty() {
                let normalized = core.normalized(asm(b_override));
                core.set(1, normalized);
            }
            let mut sched = Scheduler::new(1, 8);
            run_one(&mut core, &mut sched, 0, 0);
            let expected = if skip { vec![2] } else { vec![1] };
            assert_eq!(tasks(&sched, 0), expected, "{slt}");
        }
    }

    #[test]
    fn seq_i_compares_whole_instructions() {
        let mut core = core_with(&[
            (0, "SEQ.I $1, $2"),
            (1, "MOV.I $0, $1"),
            (2, "MOV.I $0, $1"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(tasks(&sched, 0), vec![2], "equal instructions skip");

        let mut core = core_with(&[
            (0, "SEQ.I $1, $2"),
            (1, "MOV.I $0, $1"),
            (2, "MOV.X $0, $1"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(tasks(&sched, 0), vec![1], "modifier difference is inequality");
    }

    #[test]
    fn sne_skips_on_difference() {
        let mut core = core_with(&[
            (0, "SNE.AB #1, $1"),
            (1, "DAT.F $0, $2"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        assert_eq!(tasks(&sched, 0), vec![2]);
    }

    #[test]
    fn stp_then_ldp_round_trips_through_pspace() {
        // STP.AB stores the A-operand's A-field at the index named by the
        // B-instruction's B-field.
        let mut core = core_with(&[
            (0, "STP.AB #23, $1"),
            (1, "DAT.F $0, $6"),
            (2, "LDP.AB #6, $1"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        let mut pspace = PSpaceSet::new(1, 16);

        run_one_with_pspace(&mut core, &mut sched, &mut pspace, 0, 0);
        assert_eq!(pspace.load(0, 6), 23);

        run_one_with_pspace(&mut core, &mut sched, &mut pspace, 0, 2);
        assert_eq!(core.get(3).b_field, 23);
    }

    #[test]
    fn pspace_indices_wrap_modulo_pspace_size() {
        let mut core = core_with(&[
            (0, "STP.AB #9, $1"),
            (1, "DAT.F $0, $18"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        let mut pspace = PSpaceSet::new(1, 16);
        run_one_with_pspace(&mut core, &mut sched, &mut pspace, 0, 0);
        assert_eq!(pspace.load(0, 2), 9, "index 18 wraps to 2");
    }

    #[test]
    fn ldp_reads_the_round_result_through_cell_zero() {
        let mut core = core_with(&[(0, "LDP.AB #0, $3")]);
        let mut sched = Scheduler::new(1, 8);
        let mut pspace = PSpaceSet::new(1, 16);
        pspace.set_result(0, 2);
        run_one_with_pspace(&mut core, &mut sched, &mut pspace, 0, 0);
        assert_eq!(core.get(3).b_field, 2);
    }

    #[test]
    fn stp_to_cell_zero_is_discarded() {
        let mut core = core_with(&[
            (0, "STP.AB #9, $1"),
            (1, "DAT.F $0, $0"),
        ]);
        let mut sched = Scheduler::new(1, 8);
        let mut pspace = PSpaceSet::new(1, 16);
        run_one_with_pspace(&mut core, &mut sched, &mut pspace, 0, 0);
        assert_eq!(pspace.load(0, 0), 0);
        assert_eq!(pspace.result(0), 0);
    }

    #[test]
    fn ldp_and_stp_without_pspace_behave_as_nop() {
        let mut core = core_with(&[
            (0, "LDP.AB #5, $3"),
            (1, "STP.AB #5, $3"),
        ]);
        let snapshot = core.clone();
        let mut sched = Scheduler::new(1, 8);
        run_one(&mut core, &mut sched, 0, 0);
        run_one(&mut core, &mut sched, 0, 1);
        assert_eq!(core.cells(), snapshot.cells());
        assert_eq!(tasks(&sched, 0), vec![1, 2]);
    }

    #[test]
    fn every_written_field_stays_normalized() {
        // A handful of wrap-heavy instructions; every resulting field must
        // stay inside [0, SIZE).
        let programs = [
            "SUB.F #1, $1",
            "ADD.X #39, $1",
            "DJN.F $0, $1",
            "MOV.AB {0, <0",
        ];
        for program in programs {
            let mut core = core_with(&[(0, program), (1, "DAT.F $0, $0")]);
            let mut sched = Scheduler::new(1, 8);
            run_one(&mut core, &mut sched, 0, 0);
            for (addr, cell) in core.cells().iter().enumerate() {
                assert!(
                    (0..Field::from(SIZE)).contains(&cell.a_field)
                        && (0..Field::from(SIZE)).contains(&cell.b_field),
                    "{program}: cell {addr} left unnormalized: {cell}"
                );
            }
            for pc in sched.tasks(0) {
                assert!((0..Field::from(SIZE)).contains(&pc), "{program}: pc {pc}");
            }
        }
    }
}
