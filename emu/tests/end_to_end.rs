use mlarch::{HexStyle, Image};
use mlsim::{run, Context, Fault, Sim};

fn build(listing: &str) -> Image {
    let mut image = mlasm::assemble(listing).unwrap();
    image.clear_defined();
    image
}

fn clamp(v: i32) -> u8 {
    v.clamp(-128, 127) as u8
}

#[test]
fn dot_product_to_memory() {
    let image = build(
        "
.code
    SetVBP 0
    LoadCoeff0 0x100, 0
    MACC 0x200, 0
    Store 0x300, 0
    Return
.data 0x100
    3 0xfd 7 0x80 1 2 0 0x7f
.data 0x200
    100 0x9c 50 25 0xff 1 2 127
",
    );
    let coeff = [3i8, -3, 7, -128, 1, 2, 0, 127];
    let data = [100i8, -100, 50, 25, -1, 1, 2, 127];
    let dot: i32 = coeff
        .iter()
        .zip(data)
        .map(|(&c, m)| c as i32 * m as i32)
        .sum();

    let mem = run(image, 0).unwrap();
    assert_eq!(mem.byte(0x300), clamp(dot));
    // lane 1 has an all-zero coefficient vector
    assert_eq!(mem.byte(0x301), 0);
    assert!(mem.is_defined(0x300));
    assert!(!mem.is_defined(0x302));
}

#[test]
fn store_and_relu_saturate() {
    let image = build(
        "
.code
    LdSet vals
    Store 0x400, 0
    ReLU1 0x400, 0
    Return
.data 0x80
vals:
    200 0 0 0
    0xfb 0xff 0xff 0xff
",
    );
    let mem = run(image, 0).unwrap();
    assert_eq!(mem.byte(0x400), 127);
    assert_eq!(mem.byte(0x401), 0);
    assert_eq!(mem.to_hex(HexStyle::Bytes), "@00400\n7f 00\n");
}

#[test]
fn save_then_load_round_trips() {
    let image = build(
        "
.code
    SetSBP 0x1000
    SetLBP 0x1000
    LdSet src-0x1000
    Save 0x10
    LdSet 0x40
    LdSet 0x10
    Save1 0x20
    Save0 0x2c
    Return
.data 0x1080
src:
    0x78 0x56 0x34 0x12 0xfe 0xff 0xff 0x80
",
    );
    let mem = run(image, 0).unwrap();
    assert_eq!(mem.word(0x1010), 0x1234_5678);
    assert_eq!(mem.word(0x1014), 0x80ff_fffe);
    assert_eq!(mem.word(0x1024), 0x80ff_fffe);
    assert_eq!(mem.word(0x102c), 0x1234_5678);
}

#[test]
fn maccz_and_mmaxn_seed_accumulators() {
    let image = build(
        "
.code
    LoadCoeff0 w0, 0
    ContinueLoad 1
    LoadCoeff1 w1, 0
    LdSet big
    MACCZ vec, 0
    Save 0x800
    LdSet big
    MMAXN vec, 1
    Save 0x808
    Return
.data 0x100
w0:
    1 1 1 1 1 1 1 1
    0 0 0 0 0 0 0 0
w1:
    2 2 2 2 2 2 2 2
vec:
    1 2 3 4 5 6 7 8
big:
    0 0 0 0x40 0 0 0 0x40
",
    );
    let mut sim = Sim::new(image);
    let mut ctx = Context::new();
    sim.run(&mut ctx, 0).unwrap();
    let mem = sim.mem();

    // MACCZ: 36 and 72 regardless of the loaded accumulators
    assert_eq!(mem.word(0x800), 36);
    assert_eq!(mem.word(0x804), 72);
    // MMAXN with an all-zero slot 1: sentinel in acc0, zero in acc1
    assert_eq!(mem.word(0x808) as i32, i32::MIN);
    assert_eq!(mem.word(0x80c), 0);
    assert_eq!(ctx.stats.ops, 2);
}

#[test]
fn subroutine_runs_cached_kernel() {
    let image = build(
        "
.code
    Call kernel
    SetSBP 0x10
    Call kernel
    Return
kernel:
    LoadCode ops, 0
    ContinueLoad 2
    Execute 0, 3
    Return
.data 0x100
ops:
.code
    LdSet 0x200
    LdAdd 0x200
    Store 0x300, 1
.data 0x200
    10 0 0 0 20 0 0 0
",
    );
    let mut sim = Sim::new(image);
    let mut ctx = Context::new();
    sim.run(&mut ctx, 0).unwrap();
    assert_eq!(sim.mem().byte(0x300), 10);
    assert_eq!(sim.mem().byte(0x301), 20);
    assert_eq!(sim.mem().byte(0x310), 10);
    assert_eq!(sim.mem().byte(0x311), 20);
    assert_eq!(sim.depth(), 0);
}

#[test]
fn faults_report_pc() {
    let image = build(
        "
.code 0x40
    Sync
    Store 0x300, 32
    Return
",
    );
    let fault = run(image, 0x40).unwrap_err();
    assert!(matches!(fault, Fault::At { pc: 0x44, .. }));
    assert!(matches!(fault.root(), Fault::ShiftTooLarge(32)));
}

#[test]
fn bin_round_trip_through_loader() {
    let image = mlasm::assemble(".code\n    Store 0x100, 0\n    Return\n").unwrap();
    let mut loaded = Image::new();
    loaded.load_bin(&image.to_bin(true)).unwrap();
    let mem = run(loaded, 0).unwrap();
    assert_eq!(mem.to_hex(HexStyle::Bytes), "@00100\n00 00\n");
    assert_eq!(mem.to_bin(false).len(), 0x20000);
}
