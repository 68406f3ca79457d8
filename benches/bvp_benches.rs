use RustedIPOC::numerical::BVP_DAE::BVP_DAE_traits::ProblemContract;
use RustedIPOC::numerical::BVP_DAE::NR_BVPDAE::solve;
use RustedIPOC::numerical::BVP_DAE::collocation::assemble_jacobian;
use RustedIPOC::numerical::BVP_DAE::continuation::run;
use RustedIPOC::numerical::BVP_DAE::problems::{DoubleIntegrator, Zermelo};
use RustedIPOC::numerical::BVP_DAE::solver_options::{ContinuationOptions, SolverOptions};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_double_integrator_continuation(c: &mut Criterion) {
    let solver_options = SolverOptions::new(true, 0, 1e-6);
    let options = ContinuationOptions::new(1.0, 0.5, 1e-8);
    c.bench_function("double integrator continuation", |b| {
        b.iter(|| {
            let mut contract = ProblemContract::new(DoubleIntegrator::default(), 1.0);
            run(&mut contract, None, &solver_options, black_box(&options)).is_ok()
        })
    });
}

fn bench_double_integrator_newton(c: &mut Criterion) {
    let contract = ProblemContract::new(DoubleIntegrator::default(), 1e-2);
    let options = SolverOptions::default();
    c.bench_function("double integrator single Newton solve", |b| {
        b.iter(|| solve(contract.initialize(), &contract, black_box(&options)).1.success)
    });
}

fn bench_zermelo_jacobian(c: &mut Criterion) {
    let contract = ProblemContract::new(Zermelo::default(), 1.0);
    let traj = contract.initialize();
    c.bench_function("Zermelo Jacobian assembly and compression", |b| {
        b.iter(|| {
            assemble_jacobian(&contract, black_box(&traj))
                .ok()
                .and_then(|jac| jac.to_faer().ok())
                .is_some()
        })
    });
}

criterion_group!(
    benches,
    bench_double_integrator_continuation,
    bench_double_integrator_newton,
    bench_zermelo_jacobian
);
criterion_main!(benches);
