use oci_core::machines::{build, Instrumentation, MachineKind};
use oci_core::{HarvardOci, MachineConfig, RegisterOci, StackOci, StopReason, VonNeumannOci};
use proptest::prelude::*;

fn config(ram: usize, rom: usize, commands: u64) -> MachineConfig {
    MachineConfig::new()
        .with_ram_size(ram)
        .with_rom_size(rom)
        .with_max_commands(commands)
        .with_max_output_bytes(1 << 16)
}

fn words(pc: u16, extra: &[u16], cells: &[u16]) -> Vec<u8> {
    let mut g = pc.to_le_bytes().to_vec();
    for w in extra.iter().chain(cells) {
        g.extend_from_slice(&w.to_le_bytes());
    }
    g
}

fn any_kind() -> impl Strategy<Value = MachineKind> {
    prop::sample::select(MachineKind::ALL.to_vec())
}

proptest! {
    #[test]
    fn load_then_save_reproduces_genome(kind in any_kind(), seed in prop::collection::vec(any::<u8>(), 64)) {
        let mut vm = build(kind, config(8, 4, 10), Instrumentation::Off).unwrap();
        let genome: Vec<u8> = seed.iter().cycle().take(vm.genetic_string_size()).copied().collect();
        vm.set_from_genetic_string(&genome).unwrap();
        prop_assert_eq!(vm.to_genetic_string(), genome.clone());

        let pc = match kind {
            MachineKind::Register => genome[0] as usize,
            _ => u16::from_le_bytes([genome[0], genome[1]]) as usize,
        };
        prop_assert_eq!(vm.pc(), pc);
    }

    #[test]
    fn runs_are_deterministic(
        kind in any_kind(),
        seed in prop::collection::vec(any::<u8>(), 64),
        steps in 0u64..400,
    ) {
        let cfg = config(16, 16, steps);
        let mut a = build(kind, cfg.clone(), Instrumentation::Off).unwrap();
        let mut b = build(kind, cfg, Instrumentation::On).unwrap();
        let genome: Vec<u8> = seed.iter().cycle().take(a.genetic_string_size()).copied().collect();

        a.set_from_genetic_string(&genome).unwrap();
        b.set_from_genetic_string(&genome).unwrap();
        prop_assert_eq!(a.interpret(), b.interpret());
        prop_assert_eq!(a.output(), b.output());
        prop_assert_eq!(a.to_genetic_string(), b.to_genetic_string());

        a.set_from_genetic_string(&genome).unwrap();
        b.set_from_genetic_string(&genome).unwrap();
        a.interpret_n(steps);
        b.interpret_n(steps);
        prop_assert_eq!(a.output(), b.output());
        prop_assert_eq!(a.to_genetic_string(), b.to_genetic_string());
    }

    #[test]
    fn sbnz_underflow_emits_sum(x in any::<u16>(), y in any::<u16>()) {
        prop_assume!(x < y);
        let mut vm = VonNeumannOci::new(config(8, 8, 1)).unwrap();
        vm.set_from_genetic_string(&words(0, &[], &[4, 5, 6, 0, x, y, 0, 0])).unwrap();
        vm.interpret();
        prop_assert_eq!(vm.output(), &x.wrapping_add(y).to_le_bytes()[..]);
        prop_assert_eq!(vm.machine().ram().peek(6), x.wrapping_sub(y));
    }

    #[test]
    fn sbnz_no_emission_without_underflow(x in any::<u16>(), y in any::<u16>()) {
        prop_assume!(x >= y);
        let mut vm = VonNeumannOci::new(config(8, 8, 1)).unwrap();
        vm.set_from_genetic_string(&words(0, &[], &[4, 5, 6, 0, x, y, 0, 0])).unwrap();
        vm.interpret();
        prop_assert!(vm.output().is_empty());
        let expected_pc = if x == y { 4 } else { 0 };
        prop_assert_eq!(vm.pc(), expected_pc);
    }

    #[test]
    fn command_budget_is_exact(k in 0u64..2_000) {
        // 9 - 1 is never zero, so this jumps back to 0 forever
        let mut vm = VonNeumannOci::new(config(8, 8, k)).unwrap();
        vm.set_from_genetic_string(&words(0, &[], &[4, 5, 6, 0, 9, 1, 0, 0])).unwrap();
        let run = vm.interpret();
        prop_assert_eq!(run.commands, k);
        prop_assert_eq!(run.reason, StopReason::CommandBudget);
    }

    #[test]
    fn von_neumann_store_address_wraps(k in 0u16..8, lap in 1u16..100) {
        let run = |c: u16| {
            let mut vm = VonNeumannOci::new(config(8, 8, 1)).unwrap();
            vm.set_from_genetic_string(&words(0, &[], &[4, 5, c, 0, 7, 2, 0, 0])).unwrap();
            vm.interpret();
            (vm.to_genetic_string()[2..].to_vec(), vm.pc())
        };
        // only the C operand cell differs between the two genomes
        let (mut wrapped, wrapped_pc) = run(k + 8 * lap);
        let (mut plain, plain_pc) = run(k);
        if k != 2 {
            wrapped[4..6].copy_from_slice(&[0, 0]);
            plain[4..6].copy_from_slice(&[0, 0]);
        }
        prop_assert_eq!(wrapped, plain);
        prop_assert_eq!(wrapped_pc, plain_pc);
    }

    #[test]
    fn harvard_ram_and_rom_addresses_wrap(k in 0u16..4, lap in 1u16..100) {
        let cfg = config(4, 4, 1);
        let ram = [10u16, 3, 0, 0];

        let mut plain = HarvardOci::new(cfg.clone()).unwrap();
        plain.set_from_genetic_string(&words(0, &ram, &[0, 1, k, 2])).unwrap();
        plain.interpret();

        let mut wrapped = HarvardOci::new(cfg).unwrap();
        wrapped.set_from_genetic_string(&words(4 * lap, &ram, &[0, 1, k + 4 * lap, 2])).unwrap();
        wrapped.interpret();

        prop_assert_eq!(plain.machine().ram().cells(), wrapped.machine().ram().cells());
        prop_assert_eq!(plain.pc(), wrapped.pc());
    }

    #[test]
    fn stack_pop_address_wraps(k in 0u16..16, lap in 1u16..100) {
        let run = |addr: u16| {
            let mut mem = [0u16; 16];
            mem[0] = 0b100 << 5; // pop
            mem[10] = addr;
            mem[11] = 0x5A5A;
            let mut vm = StackOci::new(config(16, 16, 1)).unwrap();
            vm.set_from_genetic_string(&words(0, &[11], &mem)).unwrap();
            vm.interpret();
            let mut cells = vm.machine().memory().cells().to_vec();
            cells[10] = 0;
            cells
        };
        prop_assert_eq!(run(k + 16 * lap), run(k));
    }

    #[test]
    fn register_data_pointer_wraps(k in 0u16..8, lap in 1u16..1000) {
        let run = |dp: u16| {
            let mut vm = RegisterOci::new(config(8, 16, 3)).unwrap();
            let mut genome = vec![0u8; vm.genetic_string_size()];
            genome[10..12].copy_from_slice(&dp.to_le_bytes());
            let rom = genome.len() - 16;
            genome[rom] = 0b0010_1010; // ldi 42
            genome[rom + 1] = 0b1000_0000; // stm
            genome[rom + 2] = 0b1110_0000; // halt
            vm.set_from_genetic_string(&genome).unwrap();
            vm.interpret();
            vm.machine().ram().cells().to_vec()
        };
        prop_assert_eq!(run(k.wrapping_add(8 * lap)), run(k));
    }
}

#[test]
fn example_genome_from_four_cell_ram() {
    // mem = [5, 3, 2, 0], pc = 0: operands are addresses, 5 wraps to 1
    let mut vm = VonNeumannOci::new(config(4, 4, 1)).unwrap();
    vm.set_from_genetic_string(&words(0, &[], &[5, 3, 2, 0])).unwrap();
    let run = vm.interpret();
    assert_eq!(run.commands, 1);
    assert!(vm.output().is_empty());
    assert_eq!(vm.machine().ram().cells(), &[5, 3, 3, 0]);
    assert_eq!(vm.pc(), 0);
}

#[test]
fn example_with_separate_data_cells() {
    // operands at 0..4 point at data 5 and 3 in cells 4 and 5
    let mut vm = VonNeumannOci::new(config(8, 8, 1)).unwrap();
    vm.set_from_genetic_string(&words(0, &[], &[4, 5, 6, 7, 5, 3, 0, 0])).unwrap();
    vm.interpret();
    assert!(vm.output().is_empty());
    assert_eq!(vm.machine().ram().peek(6), 2);
    assert_eq!(vm.pc(), 7);
}

#[test]
fn independent_instances_run_on_threads() {
    let genome = words(0, &[], &[4, 5, 6, 0, 1, 2, 0, 0]);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let genome = genome.clone();
            std::thread::spawn(move || {
                let mut vm = build(MachineKind::VonNeumann, config(8, 8, 10), Instrumentation::Off).unwrap();
                vm.set_from_genetic_string(&genome).unwrap();
                vm.interpret();
                vm.output().to_vec()
            })
        })
        .collect();
    let outputs: Vec<Vec<u8>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(outputs[0].len(), 20);
}
