use divan::{Bencher, black_box};

fn main() {
    divan::main();
}

#[divan::bench(args = [10, 20, 40, 80])]
fn fib(bencher: Bencher, n: u32) {
    bencher.bench(|| fibench_kernel::fib(black_box(n)));
}

#[divan::bench(args = [10, 20, 40, 80])]
fn fib_recursive(bencher: Bencher, n: u32) {
    bencher.bench(|| fibench_kernel::fib_recursive(black_box(n)));
}

#[divan::bench(args = [1, 100, 10_000])]
fn test_fib_40(bencher: Bencher, count: u32) {
    bencher.bench(|| fibench_kernel::test(black_box(40), black_box(count)));
}
