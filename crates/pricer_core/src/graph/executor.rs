//! Numeric execution of a recorded computation graph.
//!
//! The forward sweep evaluates every node on `paths` Monte Carlo paths,
//! drawing random numbers for variate nodes from a [`VariateSource`]. The
//! reverse sweep propagates the adjoint of the expectation of one output back
//! to the named inputs, giving exact pathwise sensitivities.
//!
//! # Example
//!
//! ```rust
//! use pricer_core::graph::{BinaryFn, ComputationGraph, GraphExecutor, NodeType, NoVariates};
//!
//! let mut graph = ComputationGraph::new();
//! let spot = graph.input("spot", 100.0);
//! let two = graph.constant(2.0);
//! let value = graph.push(NodeType::Binary(BinaryFn::Mul), &[spot, two]).unwrap();
//!
//! let executor = GraphExecutor::new(&graph);
//! let forward = executor.forward(&NoVariates { paths: 4 }).unwrap();
//! assert_eq!(forward.expectation(value).unwrap(), 200.0);
//!
//! let sensitivities = executor.backward(&forward, value).unwrap();
//! assert_eq!(sensitivities.get("spot"), Some(2.0));
//! ```

use std::collections::{BTreeMap, HashMap};

use super::error::GraphError;
use super::types::{ComputationGraph, NodeId, NodeType, VariateKey};
use crate::math::RegressionFit;
use crate::vectorized::PathVector;

/// Provider of random draws for variate nodes.
pub trait VariateSource {
    /// Number of paths the source simulates.
    fn paths(&self) -> usize;

    /// Draws for one step and factor, one per path.
    fn draws(&self, key: VariateKey) -> Option<&[f64]>;
}

/// Source for graphs without random draws.
#[derive(Debug, Clone, Copy)]
pub struct NoVariates {
    /// Number of paths to evaluate on
    pub paths: usize,
}

impl VariateSource for NoVariates {
    fn paths(&self) -> usize {
        self.paths
    }

    fn draws(&self, _key: VariateKey) -> Option<&[f64]> {
        None
    }
}

/// Node values produced by a forward sweep.
#[derive(Debug, Clone)]
pub struct ForwardPass {
    paths: usize,
    values: Vec<PathVector>,
    fits: HashMap<usize, RegressionFit>,
}

impl ForwardPass {
    /// Number of paths evaluated.
    #[inline]
    pub fn paths(&self) -> usize {
        self.paths
    }

    /// Values of one node.
    pub fn value(&self, id: NodeId) -> Result<&PathVector, GraphError> {
        self.values.get(id.0).ok_or(GraphError::UnknownNode(id.0))
    }

    /// Cross-path mean of one node.
    pub fn expectation(&self, id: NodeId) -> Result<f64, GraphError> {
        Ok(self.value(id)?.expectation())
    }
}

/// Result of a reverse sweep: the output's expectation and its derivative
/// with respect to every named input.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensitivities {
    /// Expectation of the differentiated output
    pub value: f64,
    /// Derivative per input name
    pub by_input: BTreeMap<String, f64>,
}

impl Sensitivities {
    /// Derivative with respect to one input.
    pub fn get(&self, input: &str) -> Option<f64> {
        self.by_input.get(input).copied()
    }
}

/// Executes a [`ComputationGraph`] numerically.
#[derive(Debug, Clone, Copy)]
pub struct GraphExecutor<'g> {
    graph: &'g ComputationGraph,
}

impl<'g> GraphExecutor<'g> {
    /// Executor over a recorded graph.
    pub fn new(graph: &'g ComputationGraph) -> Self {
        Self { graph }
    }

    /// Evaluates every node on the source's paths.
    pub fn forward(&self, source: &dyn VariateSource) -> Result<ForwardPass, GraphError> {
        let n = source.paths();
        let mut values: Vec<PathVector> = Vec::with_capacity(self.graph.len());
        let mut fits = HashMap::new();

        for (index, node) in self.graph.nodes().iter().enumerate() {
            let arg = |i: usize| &values[node.args[i].0];
            let value = match &node.node_type {
                NodeType::Constant(v) => PathVector::deterministic(n, *v),
                NodeType::Input(slot) => {
                    let v = self
                        .graph
                        .input_value(*slot)
                        .ok_or(GraphError::UnknownNode(index))?;
                    PathVector::deterministic(n, v)
                }
                NodeType::Variate(key) => {
                    let draws = source.draws(*key).ok_or(GraphError::MissingVariate {
                        step: key.step,
                        factor: key.factor,
                    })?;
                    PathVector::from_paths(draws.to_vec())
                }
                NodeType::Unary(f) => arg(0).map(|x| f.apply(x)),
                NodeType::Binary(f) => arg(0)
                    .zip_map(arg(1), |a, b| f.apply(a, b))
                    .map_err(|_| GraphError::UnknownNode(index))?,
                NodeType::Indicator(cmp) => arg(0)
                    .compare(arg(1), *cmp)
                    .map_err(|_| GraphError::UnknownNode(index))?
                    .to_indicator(),
                NodeType::And => indicator(arg(0), arg(1), |a, b| a && b, index)?,
                NodeType::Or => indicator(arg(0), arg(1), |a, b| a || b, index)?,
                NodeType::Not => arg(0).truthy().not().to_indicator(),
                NodeType::Select => {
                    PathVector::select(&arg(0).truthy(), arg(1), arg(2))
                        .map_err(|_| GraphError::UnknownNode(index))?
                }
                NodeType::ConditionalExpectation { order, masked } => {
                    let regressand = arg(0);
                    if regressand.is_deterministic() {
                        regressand.clone()
                    } else {
                        let (mask, regressors) =
                            split_regression_args(&values, &node.args, *masked);
                        let x: Vec<&[f64]> = regressors.iter().map(|r| r.as_ref()).collect();
                        let y = regressand.values();
                        let fit = RegressionFit::fit(&y, &x, mask.as_deref(), *order)?;
                        let fitted = if x.is_empty() {
                            fit.evaluate_constant(n)?
                        } else {
                            fit.evaluate(&x)?
                        };
                        fits.insert(index, fit);
                        PathVector::from_paths(fitted)
                    }
                }
                NodeType::Expectation => PathVector::deterministic(n, arg(0).expectation()),
            };
            values.push(value);
        }

        Ok(ForwardPass {
            paths: n,
            values,
            fits,
        })
    }

    /// Differentiates the expectation of `output` with respect to every input.
    pub fn backward(
        &self,
        forward: &ForwardPass,
        output: NodeId,
    ) -> Result<Sensitivities, GraphError> {
        self.graph.node(output)?;
        let n = forward.paths;
        let mut adjoints: Vec<Option<Vec<f64>>> = vec![None; output.0 + 1];
        adjoints[output.0] = Some(vec![1.0 / n as f64; n]);
        let mut by_input: BTreeMap<String, f64> = self
            .graph
            .inputs()
            .iter()
            .map(|i| (i.name.clone(), 0.0))
            .collect();

        for index in (0..=output.0).rev() {
            let Some(adj) = adjoints[index].take() else {
                continue;
            };
            let node = &self.graph.nodes()[index];
            let value = &forward.values[index];
            let arg_value = |i: usize| &forward.values[node.args[i].0];

            match &node.node_type {
                NodeType::Input(slot) => {
                    let name = &self.graph.inputs()[*slot].name;
                    if let Some(total) = by_input.get_mut(name) {
                        *total += adj.iter().sum::<f64>();
                    }
                }
                NodeType::Unary(f) => {
                    let x = arg_value(0);
                    accumulate(&mut adjoints, node.args[0], n, |p| {
                        adj[p] * f.derivative(x.at(p), value.at(p))
                    });
                }
                NodeType::Binary(f) => {
                    let (a, b) = (arg_value(0), arg_value(1));
                    let partial = |p: usize| f.partials(a.at(p), b.at(p), value.at(p));
                    accumulate(&mut adjoints, node.args[0], n, |p| adj[p] * partial(p).0);
                    accumulate(&mut adjoints, node.args[1], n, |p| adj[p] * partial(p).1);
                }
                NodeType::Select => {
                    let flags = arg_value(0).truthy();
                    accumulate(&mut adjoints, node.args[1], n, |p| {
                        if flags.at(p) {
                            adj[p]
                        } else {
                            0.0
                        }
                    });
                    accumulate(&mut adjoints, node.args[2], n, |p| {
                        if flags.at(p) {
                            0.0
                        } else {
                            adj[p]
                        }
                    });
                }
                NodeType::ConditionalExpectation { masked, .. } => match forward.fits.get(&index) {
                    None => accumulate(&mut adjoints, node.args[0], n, |p| adj[p]),
                    Some(fit) => {
                        let (mask, regressors) =
                            split_regression_args(&forward.values, &node.args, *masked);
                        let x: Vec<&[f64]> = regressors.iter().map(|r| r.as_ref()).collect();
                        let pulled = fit.regressand_adjoint(&x, mask.as_deref(), &adj)?;
                        accumulate(&mut adjoints, node.args[0], n, |p| pulled[p]);
                    }
                },
                NodeType::Expectation => {
                    let mean = adj.iter().sum::<f64>() / n as f64;
                    accumulate(&mut adjoints, node.args[0], n, |_| mean);
                }
                NodeType::Constant(_)
                | NodeType::Variate(_)
                | NodeType::Indicator(_)
                | NodeType::And
                | NodeType::Or
                | NodeType::Not => {}
            }
        }

        Ok(Sensitivities {
            value: forward.expectation(output)?,
            by_input,
        })
    }
}

fn indicator(
    a: &PathVector,
    b: &PathVector,
    f: impl Fn(bool, bool) -> bool,
    index: usize,
) -> Result<PathVector, GraphError> {
    a.zip_map(b, |x, y| if f(x > 0.5, y > 0.5) { 1.0 } else { 0.0 })
        .map_err(|_| GraphError::UnknownNode(index))
}

type RegressionArgs<'a> = (
    Option<std::borrow::Cow<'a, [bool]>>,
    Vec<std::borrow::Cow<'a, [f64]>>,
);

fn split_regression_args<'a>(
    values: &'a [PathVector],
    args: &[NodeId],
    masked: bool,
) -> RegressionArgs<'a> {
    let first_regressor = if masked { 2 } else { 1 };
    let mask = masked.then(|| {
        std::borrow::Cow::Owned(values[args[1].0].truthy().values().into_owned())
    });
    let regressors = args[first_regressor..]
        .iter()
        .map(|a| values[a.0].values())
        .collect();
    (mask, regressors)
}

fn accumulate(
    adjoints: &mut [Option<Vec<f64>>],
    target: NodeId,
    n: usize,
    contribution: impl Fn(usize) -> f64,
) {
    let slot = adjoints[target.0].get_or_insert_with(|| vec![0.0; n]);
    for (p, a) in slot.iter_mut().enumerate() {
        *a += contribution(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BinaryFn, UnaryFn};
    use crate::vectorized::Comparison;
    use approx::assert_relative_eq;

    struct FixedDraws {
        draws: Vec<f64>,
    }

    impl VariateSource for FixedDraws {
        fn paths(&self) -> usize {
            self.draws.len()
        }

        fn draws(&self, key: VariateKey) -> Option<&[f64]> {
            (key.step == 0 && key.factor == 0).then_some(self.draws.as_slice())
        }
    }

    #[test]
    fn test_lognormal_delta_and_vega() {
        // S = S0 * exp(-0.5 vol^2 + vol * z); payoff S
        let mut g = ComputationGraph::new();
        let s0 = g.input("spot", 100.0);
        let vol = g.input("vol", 0.2);
        let z = g.variate(VariateKey { step: 0, factor: 0 });
        let half = g.constant(-0.5);
        let v2 = g.push(NodeType::Binary(BinaryFn::Mul), &[vol, vol]).unwrap();
        let drift = g.push(NodeType::Binary(BinaryFn::Mul), &[half, v2]).unwrap();
        let shock = g.push(NodeType::Binary(BinaryFn::Mul), &[vol, z]).unwrap();
        let expo = g.push(NodeType::Binary(BinaryFn::Add), &[drift, shock]).unwrap();
        let growth = g.push(NodeType::Unary(UnaryFn::Exp), &[expo]).unwrap();
        let s = g.push(NodeType::Binary(BinaryFn::Mul), &[s0, growth]).unwrap();

        let source = FixedDraws {
            draws: vec![-1.0, 0.0, 1.0],
        };
        let executor = GraphExecutor::new(&g);
        let forward = executor.forward(&source).unwrap();
        let sens = executor.backward(&forward, s).unwrap();

        let expected: Vec<f64> = [-1.0_f64, 0.0, 1.0]
            .iter()
            .map(|z| (-0.02 + 0.2 * z).exp())
            .collect();
        let mean_growth = expected.iter().sum::<f64>() / 3.0;
        assert_relative_eq!(sens.value, 100.0 * mean_growth, epsilon = 1e-12);
        assert_relative_eq!(sens.get("spot").unwrap(), mean_growth, epsilon = 1e-12);

        let vega: f64 = [-1.0_f64, 0.0, 1.0]
            .iter()
            .zip(&expected)
            .map(|(z, e)| 100.0 * e * (-0.2 + z))
            .sum::<f64>()
            / 3.0;
        assert_relative_eq!(sens.get("vol").unwrap(), vega, epsilon = 1e-12);
    }

    #[test]
    fn test_select_routes_adjoint_by_indicator() {
        let mut g = ComputationGraph::new();
        let a = g.input("a", 2.0);
        let b = g.input("b", 3.0);
        let z = g.variate(VariateKey { step: 0, factor: 0 });
        let zero = g.constant(0.0);
        let cond = g
            .push(NodeType::Indicator(Comparison::Gt), &[z, zero])
            .unwrap();
        let out = g.push(NodeType::Select, &[cond, a, b]).unwrap();

        let source = FixedDraws {
            draws: vec![1.0, -1.0, 1.0, 1.0],
        };
        let executor = GraphExecutor::new(&g);
        let forward = executor.forward(&source).unwrap();
        assert_eq!(forward.value(out).unwrap().values().as_ref(), &[2.0, 3.0, 2.0, 2.0]);
        let sens = executor.backward(&forward, out).unwrap();
        assert_relative_eq!(sens.get("a").unwrap(), 0.75, epsilon = 1e-15);
        assert_relative_eq!(sens.get("b").unwrap(), 0.25, epsilon = 1e-15);
    }

    #[test]
    fn test_missing_variate() {
        let mut g = ComputationGraph::new();
        g.variate(VariateKey { step: 3, factor: 1 });
        let err = GraphExecutor::new(&g)
            .forward(&NoVariates { paths: 2 })
            .unwrap_err();
        assert_eq!(err, GraphError::MissingVariate { step: 3, factor: 1 });
    }

    #[test]
    fn test_conditional_expectation_of_deterministic_passes_through() {
        let mut g = ComputationGraph::new();
        let x = g.input("x", 4.0);
        let z = g.variate(VariateKey { step: 0, factor: 0 });
        let ce = g
            .push(
                NodeType::ConditionalExpectation {
                    order: 2,
                    masked: false,
                },
                &[x, z],
            )
            .unwrap();
        let source = FixedDraws {
            draws: vec![0.1, 0.2],
        };
        let executor = GraphExecutor::new(&g);
        let forward = executor.forward(&source).unwrap();
        assert_eq!(forward.expectation(ce).unwrap(), 4.0);
        let sens = executor.backward(&forward, ce).unwrap();
        assert_relative_eq!(sens.get("x").unwrap(), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_conditional_expectation_on_regressor_function_is_exact() {
        // y = c * z^2 is a polynomial in z, so E[y|z] = y and d/dc = E[z^2]
        let mut g = ComputationGraph::new();
        let c = g.input("c", 3.0);
        let z = g.variate(VariateKey { step: 0, factor: 0 });
        let z2 = g.push(NodeType::Binary(BinaryFn::Mul), &[z, z]).unwrap();
        let y = g.push(NodeType::Binary(BinaryFn::Mul), &[c, z2]).unwrap();
        let ce = g
            .push(
                NodeType::ConditionalExpectation {
                    order: 2,
                    masked: false,
                },
                &[y, z],
            )
            .unwrap();
        let draws: Vec<f64> = (0..20).map(|i| -1.0 + i as f64 * 0.1).collect();
        let mean_z2 = draws.iter().map(|z| z * z).sum::<f64>() / 20.0;
        let source = FixedDraws { draws };
        let executor = GraphExecutor::new(&g);
        let forward = executor.forward(&source).unwrap();
        let sens = executor.backward(&forward, ce).unwrap();
        assert_relative_eq!(sens.value, 3.0 * mean_z2, epsilon = 1e-9);
        assert_relative_eq!(sens.get("c").unwrap(), mean_z2, epsilon = 1e-9);
    }
}
