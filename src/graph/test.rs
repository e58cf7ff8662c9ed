// Tests for the module dependency graph
//
//  Copyright (C) 2014-2022 Ryan Specialty Group, LLC.
//
//  This file is part of SYMVIS.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

use super::*;
use crate::module::LinkMode;

type Sut = DepGraphBuilder;

fn module(name: &str, deps: &[&str]) -> ModuleDescriptor {
    ModuleDescriptor::new(name, LinkMode::Static).with_deps(deps.iter().copied())
}

fn build(modules: Vec<ModuleDescriptor>) -> GraphResult<DepGraph> {
    let mut sut = Sut::with_capacity(modules.len());

    for m in modules {
        sut.add_module(m)?;
    }

    sut.resolve_dependencies()
}

fn names<'a>(iter: impl IntoIterator<Item = &'a ModuleDescriptor>) -> Vec<&'a str> {
    iter.into_iter().map(ModuleDescriptor::name).collect()
}

#[test]
fn duplicate_module_fails() {
    let mut sut = Sut::new();

    assert_eq!(Ok(()), sut.add_module(module("liba", &[])));
    assert_eq!(
        Err(GraphError::DuplicateModule("liba".into())),
        sut.add_module(module("liba", &["libb"])),
    );

    // The first declaration must have been retained.
    assert_eq!(1, sut.len());
    let graph = sut.resolve_dependencies().unwrap();
    assert!(graph.get("liba").unwrap().dependencies().is_empty());
}

#[test]
fn unknown_dependency_fails() {
    let result = build(vec![module("liba", &[]), module("libb", &["libz"])]);

    assert_eq!(
        Err(GraphError::UnknownDependency {
            module: "libb".into(),
            dependency: "libz".into(),
        }),
        result.map(|_| ()),
    );
}

#[test]
fn dependencies_may_be_declared_after_dependents() -> GraphResult<()> {
    let graph = build(vec![module("prog", &["liba"]), module("liba", &[])])?;

    assert!(graph.depends_on("prog", "liba")?);
    assert!(!graph.depends_on("liba", "prog")?);

    Ok(())
}

#[test]
fn two_module_cycle_fails() {
    let result = build(vec![module("a", &["b"]), module("b", &["a"])]);

    assert_eq!(
        Err(GraphError::CyclicDependency(vec![vec![
            "a".into(),
            "b".into()
        ]])),
        result.map(|_| ()),
    );
}

#[test]
fn self_dependency_is_cycle() {
    let result = build(vec![module("a", &[]), module("b", &["b"])]);

    assert_eq!(
        Err(GraphError::CyclicDependency(vec![vec!["b".into()]])),
        result.map(|_| ()),
    );
}

#[test]
fn reports_every_cycle() {
    let result = build(vec![
        module("ok", &[]),
        module("a", &["b", "ok"]),
        module("b", &["a"]),
        module("x", &["y"]),
        module("y", &["z"]),
        module("z", &["x"]),
    ]);

    match result {
        Err(GraphError::CyclicDependency(cycles)) => {
            assert_eq!(
                vec![
                    vec!["a".to_string(), "b".into()],
                    vec!["x".into(), "y".into(), "z".into()],
                ],
                cycles,
            );
        }
        bad => panic!("expected CyclicDependency: {:?}", bad),
    }
}

#[test]
fn cycle_follows_dependency_edges() {
    // Declared a, b, c but linked a -> c -> b -> a.
    let result = build(vec![
        module("a", &["c"]),
        module("b", &["a"]),
        module("c", &["b"]),
    ]);

    match result {
        Err(err @ GraphError::CyclicDependency(_)) => {
            assert_eq!(
                GraphError::CyclicDependency(vec![vec![
                    "a".into(),
                    "c".into(),
                    "b".into(),
                ]]),
                err,
            );
            assert!(err.to_string().contains("cycle: a -> c -> b -> a"));
        }
        bad => panic!("expected CyclicDependency: {:?}", bad.map(|_| ())),
    }
}

#[test]
fn cycle_path_backtracks_out_of_inner_loop() {
    // From `b`, `c` is tried first but only leads back to `b`.
    let result = build(vec![
        module("a", &["b"]),
        module("b", &["c", "d"]),
        module("c", &["b"]),
        module("d", &["a"]),
    ]);

    assert_eq!(
        Err(GraphError::CyclicDependency(vec![vec![
            "a".into(),
            "b".into(),
            "d".into(),
        ]])),
        result.map(|_| ()),
    );
}

#[test]
fn cycle_error_display_shows_path() {
    let err = GraphError::CyclicDependency(vec![vec!["a".into(), "b".into()]]);

    assert_eq!("cyclic dependencies\n  cycle: a -> b -> a", err.to_string());
}

#[test]
fn transitive_dependents_of_chain() -> GraphResult<()> {
    // C -> B -> A, and an unrelated D.
    let graph = build(vec![
        module("a", &[]),
        module("b", &["a"]),
        module("c", &["b"]),
        module("d", &[]),
    ])?;

    assert_eq!(vec!["b", "c"], names(graph.transitive_dependents("a")?));
    assert_eq!(vec!["c"], names(graph.transitive_dependents("b")?));
    assert!(graph.transitive_dependents("c")?.is_empty());
    assert!(graph.transitive_dependents("d")?.is_empty());

    assert_eq!(vec!["a", "b"], names(graph.transitive_dependencies("c")?));
    assert!(graph.transitive_dependencies("a")?.is_empty());

    Ok(())
}

#[test]
fn transitive_dependents_of_diamond() -> GraphResult<()> {
    let graph = build(vec![
        module("base", &[]),
        module("left", &["base"]),
        module("right", &["base"]),
        module("top", &["left", "right"]),
    ])?;

    assert_eq!(
        vec!["left", "right", "top"],
        names(graph.transitive_dependents("base")?)
    );

    Ok(())
}

#[test]
fn queries_on_unknown_module_fail() -> GraphResult<()> {
    let graph = build(vec![module("a", &[])])?;

    assert_eq!(
        Err(GraphError::UnknownModule("nope".into())),
        graph.transitive_dependents("nope").map(|_| ()),
    );
    assert_eq!(
        Err(GraphError::UnknownModule("nope".into())),
        graph.depends_on("a", "nope"),
    );
    assert!(graph.get("nope").is_none());
    assert!(graph.lookup("a").is_ok());

    Ok(())
}

#[test]
fn topological_order_of_chain() -> GraphResult<()> {
    // Declared in reverse so that declaration order alone would be wrong.
    let graph = build(vec![
        module("outer", &["middle"]),
        module("middle", &["inner"]),
        module("inner", &[]),
    ])?;

    assert_eq!(
        vec!["inner", "middle", "outer"],
        names(graph.topological_order())
    );

    Ok(())
}

#[test]
fn topological_order_respects_declared_dep_order() -> GraphResult<()> {
    let graph = build(vec![
        module("prog", &["libb", "liba"]),
        module("liba", &[]),
        module("libb", &["libc"]),
        module("libc", &[]),
        module("lonely", &[]),
    ])?;

    let order = names(graph.topological_order());

    assert_eq!(vec!["libc", "libb", "liba", "prog", "lonely"], order);

    Ok(())
}

#[test]
fn topological_order_visits_shared_dep_once() -> GraphResult<()> {
    let graph = build(vec![
        module("top", &["left", "right"]),
        module("left", &["base"]),
        module("right", &["base"]),
        module("base", &[]),
    ])?;

    let order = names(graph.topological_order());

    assert_eq!(vec!["base", "left", "right", "top"], order);

    Ok(())
}

#[test]
fn topological_order_places_deps_first() -> GraphResult<()> {
    let graph = build(vec![
        module("a", &["d", "e"]),
        module("b", &["a", "c"]),
        module("c", &["e"]),
        module("d", &[]),
        module("e", &["d"]),
        module("f", &["b"]),
    ])?;

    let order = names(graph.topological_order());
    assert_eq!(graph.len(), order.len());

    let pos = |name: &str| order.iter().position(|n| *n == name).unwrap();

    for m in graph.modules() {
        for dep in m.dependencies() {
            assert!(
                pos(dep) < pos(m.name()),
                "{dep} must precede {}",
                m.name()
            );
        }
    }

    // Deterministic between runs.
    assert_eq!(order, names(graph.topological_order()));

    Ok(())
}

#[test]
fn topological_order_is_lazy() -> GraphResult<()> {
    let graph = build(vec![module("a", &[]), module("b", &["a"])])?;

    let mut order = graph.topological_order();
    assert_eq!(Some("a"), order.next().map(ModuleDescriptor::name));
    assert_eq!(Some("b"), order.next().map(ModuleDescriptor::name));
    assert_eq!(None, order.next().map(ModuleDescriptor::name));

    Ok(())
}

#[test]
fn empty_graph() -> GraphResult<()> {
    let graph = Sut::new().resolve_dependencies()?;

    assert!(graph.is_empty());
    assert_eq!(None, graph.topological_order().next());

    Ok(())
}
