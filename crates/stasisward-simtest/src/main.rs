//! StasisWard Headless Simulation Harness
//!
//! Runs the containment facility simulation end to end, entirely
//! in-process. No rendering, no host UI.
//!
//! Usage:
//!   cargo run -p stasisward-simtest
//!   cargo run -p stasisward-simtest -- --verbose

use serde::Deserialize;
use stasisward_core::prelude::*;

// ── Scenario manifest ───────────────────────────────────────────────────
const SCENARIOS_JSON: &str = include_str!("../data/scenarios.json");

#[derive(Debug, Deserialize)]
struct ScenarioSpec {
    name: String,
    width: i32,
    height: i32,
    facilities: Vec<FacilitySpec>,
    actors: Vec<ActorSpec>,
}

#[derive(Debug, Deserialize)]
struct FacilitySpec {
    x: i32,
    y: i32,
    interaction_x: i32,
    interaction_y: i32,
}

#[derive(Debug, Deserialize)]
struct ActorSpec {
    name: String,
    x: i32,
    y: i32,
    food: f32,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== StasisWard Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Scenario manifest validation
    results.extend(validate_scenarios(verbose));

    // 2. Admission gating
    results.extend(validate_admission(verbose));

    // 3. Hauling tasks end to end
    results.extend(validate_hauling(verbose));

    // 4. Stasis biology and starvation
    results.extend(validate_stasis_biology(verbose));

    // 5. Inventory overflow
    results.extend(validate_inventory_overflow(verbose));

    // 6. Save / load round trip
    results.extend(validate_persistence(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn build_scenario(spec: &ScenarioSpec) -> Simulation {
    let mut sim = Simulation::new(Terrain::new(spec.width, spec.height))
        .expect("task registry must validate");
    for f in &spec.facilities {
        sim.spawn_facility(
            Cell::new(f.x, f.y),
            Cell::new(f.interaction_x, f.interaction_y),
        );
    }
    for a in &spec.actors {
        let mut needs = Needs::default();
        needs.food = a.food;
        sim.spawn_actor(a.name.clone(), Cell::new(a.x, a.y), needs);
    }
    sim
}

// ── 1. Scenario Manifest ────────────────────────────────────────────────

fn validate_scenarios(verbose: bool) -> Vec<TestResult> {
    println!("--- Scenario Manifest ---");
    let mut results = Vec::new();

    let scenarios: Vec<ScenarioSpec> = match serde_json::from_str(SCENARIOS_JSON) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult {
                name: "scenarios_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return results;
        }
    };

    results.push(TestResult {
        name: "scenarios_not_empty".into(),
        passed: !scenarios.is_empty(),
        detail: format!("{} scenarios loaded", scenarios.len()),
    });

    // Everything fits on its map
    let mut all_in_bounds = true;
    for s in &scenarios {
        let terrain = Terrain::new(s.width, s.height);
        for f in &s.facilities {
            if !terrain.in_bounds(Cell::new(f.x, f.y))
                || !terrain.in_bounds(Cell::new(f.interaction_x, f.interaction_y))
            {
                all_in_bounds = false;
            }
        }
        for a in &s.actors {
            if !terrain.in_bounds(Cell::new(a.x, a.y)) {
                all_in_bounds = false;
            }
        }
    }
    results.push(TestResult {
        name: "scenarios_in_bounds".into(),
        passed: all_in_bounds,
        detail: "all spawn points inside their maps".into(),
    });

    // Food levels sane
    let bad_food = scenarios
        .iter()
        .flat_map(|s| s.actors.iter())
        .filter(|a| !(0.0..=1.0).contains(&a.food))
        .count();
    results.push(TestResult {
        name: "scenarios_food_range".into(),
        passed: bad_food == 0,
        detail: format!("{} actors outside [0,1] food", bad_food),
    });

    // Each builds into a live simulation
    let mut all_build = true;
    for s in &scenarios {
        let sim = build_scenario(s);
        let facilities = sim.world().query::<&Facility>().iter().count();
        let actors = sim.world().query::<&Actor>().iter().count();
        if facilities != s.facilities.len() || actors != s.actors.len() {
            all_build = false;
        }
        if verbose {
            println!(
                "  scenario {}: {} facilities, {} actors",
                s.name, facilities, actors
            );
        }
    }
    results.push(TestResult {
        name: "scenarios_build".into(),
        passed: all_build,
        detail: "every scenario spawns its full population".into(),
    });

    results
}

// ── 2. Admission Gating ─────────────────────────────────────────────────

fn validate_admission(_verbose: bool) -> Vec<TestResult> {
    println!("--- Admission Gating ---");
    let mut results = Vec::new();

    let scenarios: Vec<ScenarioSpec> = serde_json::from_str(SCENARIOS_JSON).unwrap();
    let mut sim = build_scenario(&scenarios[0]);

    let facility = sim
        .world()
        .query::<&Facility>()
        .iter()
        .map(|(e, _)| e)
        .next()
        .unwrap();
    let actor = sim
        .world()
        .query::<&Actor>()
        .iter()
        .map(|(e, _)| e)
        .next()
        .unwrap();

    // Unpowered pod refuses entry
    sim.set_power(facility, false);
    let refusal = sim.can_accept(facility, actor);
    results.push(TestResult {
        name: "admission_unpowered_refused".into(),
        passed: refusal == Err(RefusalReason::Unavailable),
        detail: format!("{:?}", refusal),
    });

    // Power restored, admission succeeds
    sim.set_power(facility, true);
    let accepted = sim.try_accept(facility, actor);
    let occupied = sim
        .world()
        .get::<&Facility>(facility)
        .map(|f| f.is_occupied() && f.suspension_applied)
        .unwrap_or(false);
    results.push(TestResult {
        name: "admission_accept_suspends".into(),
        passed: accepted && occupied,
        detail: "occupant stored with suspension applied".into(),
    });

    // Second actor refused while occupied
    let second = sim
        .world()
        .query::<(&Actor, &Position)>()
        .iter()
        .map(|(e, _)| e)
        .next()
        .unwrap();
    let refusal = sim.can_accept(facility, second);
    results.push(TestResult {
        name: "admission_occupied_refused".into(),
        passed: refusal == Err(RefusalReason::Occupied),
        detail: format!("{:?}", refusal),
    });

    // Eject works even unpowered, and clears the suspension
    sim.set_power(facility, false);
    let ejected = sim.eject_occupant(facility);
    let outside = sim.world().get::<&Position>(actor).is_ok();
    results.push(TestResult {
        name: "admission_eject_unpowered".into(),
        passed: ejected && outside,
        detail: "occupant back on the map with power off".into(),
    });

    results
}

// ── 3. Hauling Tasks ────────────────────────────────────────────────────

fn validate_hauling(_verbose: bool) -> Vec<TestResult> {
    println!("--- Hauling Tasks ---");
    let mut results = Vec::new();

    let scenarios: Vec<ScenarioSpec> = serde_json::from_str(SCENARIOS_JSON).unwrap();
    let mut sim = build_scenario(&scenarios[1]);

    let entities: Vec<_> = sim
        .world()
        .query::<(&Actor, &Name)>()
        .iter()
        .map(|(e, (_, n))| (e, n.0.clone()))
        .collect();
    let worker_e = entities.iter().find(|(_, n)| n == "Cai").unwrap().0;
    let patient_e = entities.iter().find(|(_, n)| n == "Dru").unwrap().0;
    let worker = sim.actor_id(worker_e).unwrap();
    let patient = sim.actor_id(patient_e).unwrap();

    sim.world_mut().insert_one(patient_e, Downed).unwrap();

    // The scanner picks the nearest free pod
    let pod = sim.find_facility_for(worker, patient);
    results.push(TestResult {
        name: "hauling_scanner_finds_pod".into(),
        passed: pod.is_some(),
        detail: format!("selected facility {:?}", pod),
    });
    let Some(pod) = pod else { return results };

    // Full carry: walk, pick up, insert after the mechanism delay
    sim.submit_task(TaskKind::CarryToFacility, TaskRequest::carry(worker, patient, pod))
        .unwrap();
    for _ in 0..400 {
        sim.tick();
    }
    let delivered = sim
        .world()
        .query::<(&FacilityId, &Facility)>()
        .iter()
        .any(|(_, (id, f))| id.0 == pod && f.occupant_id == Some(patient));
    results.push(TestResult {
        name: "hauling_carry_delivers".into(),
        passed: delivered && sim.tasks().is_empty(),
        detail: "patient contained, task retired".into(),
    });

    // Worker stayed outside and unburdened
    let worker_free = sim.world().get::<&Position>(worker_e).is_ok()
        && sim.world().get::<&Carrying>(worker_e).is_err();
    results.push(TestResult {
        name: "hauling_worker_unburdened".into(),
        passed: worker_free,
        detail: "worker on the map with empty hands".into(),
    });

    // Item insertion to the second (still empty) pod
    let empty_pod_e = sim
        .world()
        .query::<(&FacilityId, &Facility)>()
        .iter()
        .find(|(_, (_, f))| !f.is_occupied())
        .map(|(e, _)| e)
        .unwrap();
    let empty_pod = sim.facility_id(empty_pod_e).unwrap();
    sim.give_item(worker_e, ItemStack::new("rations", 40, 75));
    sim.submit_task(TaskKind::InsertCarriedItem, TaskRequest::insert(worker, empty_pod))
        .unwrap();
    for _ in 0..200 {
        sim.tick();
    }
    let stored = sim
        .world()
        .get::<&Facility>(empty_pod_e)
        .map(|f| f.inventory.len() == 1)
        .unwrap_or(false);
    results.push(TestResult {
        name: "hauling_insert_stores_item".into(),
        passed: stored,
        detail: "carried stack landed in facility storage".into(),
    });

    results
}

// ── 4. Stasis Biology ───────────────────────────────────────────────────

fn validate_stasis_biology(verbose: bool) -> Vec<TestResult> {
    println!("--- Stasis Biology ---");
    let mut results = Vec::new();

    let scenarios: Vec<ScenarioSpec> = serde_json::from_str(SCENARIOS_JSON).unwrap();
    let mut sim = build_scenario(&scenarios[1]);
    let interval = sim.config().need_interval_ticks;
    let per_interval = sim.config().deprivation_per_interval;

    // Contain the actor that spawned with an empty stomach
    let starving_e = sim
        .world()
        .query::<(&Name, &Needs)>()
        .iter()
        .find(|(_, (_, n))| n.food == 0.0)
        .map(|(e, _)| e)
        .unwrap();
    let pod_e = sim
        .world()
        .query::<&Facility>()
        .iter()
        .map(|(e, _)| e)
        .next()
        .unwrap();
    assert!(sim.try_accept(pod_e, starving_e));

    // One interval: deprivation accrues at the configured rate
    for _ in 0..interval {
        sim.tick();
    }
    let severity = sim
        .world()
        .get::<&Conditions>(starving_e)
        .map(|c| c.severity(ConditionKind::Deprivation).unwrap_or(0.0))
        .unwrap_or(0.0);
    results.push(TestResult {
        name: "stasis_deprivation_rate".into(),
        passed: (severity - per_interval).abs() < 1e-6,
        detail: format!("severity {:.4} after one interval", severity),
    });

    // Run to lethal severity: 1.0 / rate intervals in total
    let intervals_to_death = (1.0 / per_interval).ceil() as u64;
    for _ in 0..interval * intervals_to_death {
        sim.tick();
    }
    let dead = sim.world().get::<&Dead>(starving_e).is_ok();
    let outside = sim.world().get::<&Position>(starving_e).is_ok();
    let slot_clear = sim
        .world()
        .get::<&Facility>(pod_e)
        .map(|f| !f.is_occupied() && !f.suspension_applied)
        .unwrap_or(false);
    results.push(TestResult {
        name: "stasis_starvation_death".into(),
        passed: dead && outside && slot_clear,
        detail: format!(
            "dead={} placed_outside={} slot_clear={}",
            dead, outside, slot_clear
        ),
    });

    let death_notices = sim
        .notices()
        .iter()
        .filter(|n| n.contains("starved to death in stasis"))
        .count();
    results.push(TestResult {
        name: "stasis_death_exactly_once".into(),
        passed: death_notices == 1,
        detail: format!("{} death notices", death_notices),
    });

    // Well-fed actors outside are unharmed over the same stretch
    let healthy_alive = sim
        .world()
        .query::<(&Actor, &Needs)>()
        .iter()
        .filter(|(e, _)| sim.world().get::<&Dead>(*e).is_err())
        .count();
    results.push(TestResult {
        name: "stasis_bystanders_unharmed".into(),
        passed: healthy_alive == 2,
        detail: format!("{} actors still alive", healthy_alive),
    });

    if verbose {
        println!("  death after {} intervals of {} ticks", intervals_to_death, interval);
    }

    results
}

// ── 5. Inventory Overflow ───────────────────────────────────────────────

fn validate_inventory_overflow(_verbose: bool) -> Vec<TestResult> {
    println!("--- Inventory Overflow ---");
    let mut results = Vec::new();

    let scenarios: Vec<ScenarioSpec> = serde_json::from_str(SCENARIOS_JSON).unwrap();
    let mut sim = build_scenario(&scenarios[0]);

    let pod_e = sim
        .world()
        .query::<&Facility>()
        .iter()
        .map(|(e, _)| e)
        .next()
        .unwrap();
    let pod = sim.facility_id(pod_e).unwrap();
    let worker_e = sim
        .world()
        .query::<&Actor>()
        .iter()
        .map(|(e, _)| e)
        .next()
        .unwrap();
    let worker = sim.actor_id(worker_e).unwrap();

    // Fill to the stack-count cap with incompatible kinds
    let capacity = {
        let mut f = sim.world_mut().get::<&mut Facility>(pod_e).unwrap();
        let capacity = f.inventory.capacity();
        for i in 0..capacity {
            f.inventory
                .add(ItemStack::new(format!("crate-{}", i), 10, 10))
                .unwrap();
        }
        capacity
    };
    results.push(TestResult {
        name: "overflow_filled_to_cap".into(),
        passed: capacity == 30,
        detail: format!("capacity {}", capacity),
    });

    sim.give_item(worker_e, ItemStack::new("rations", 5, 75));
    sim.submit_task(TaskKind::InsertCarriedItem, TaskRequest::insert(worker, pod))
        .unwrap();
    for _ in 0..200 {
        sim.tick();
    }

    let len = sim
        .world()
        .get::<&Facility>(pod_e)
        .map(|f| f.inventory.len())
        .unwrap_or(0);
    let on_ground: u32 = sim
        .world()
        .query::<(&ItemStack, &Position)>()
        .iter()
        .map(|(_, (s, _))| s.count)
        .sum();
    let noticed = sim.notices().contains("storage is full");
    results.push(TestResult {
        name: "overflow_drops_to_ground".into(),
        passed: len == capacity && on_ground == 5 && noticed,
        detail: format!(
            "stored={} ground_units={} notice={}",
            len, on_ground, noticed
        ),
    });

    results
}

// ── 6. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(_verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let scenarios: Vec<ScenarioSpec> = serde_json::from_str(SCENARIOS_JSON).unwrap();
    let mut sim = build_scenario(&scenarios[0]);

    let pod_e = sim
        .world()
        .query::<&Facility>()
        .iter()
        .map(|(e, _)| e)
        .next()
        .unwrap();
    let actor_e = sim
        .world()
        .query::<&Actor>()
        .iter()
        .map(|(e, _)| e)
        .next()
        .unwrap();
    let occupant = sim.actor_id(actor_e).unwrap();
    assert!(sim.try_accept(pod_e, actor_e));
    {
        let mut f = sim.world_mut().get::<&mut Facility>(pod_e).unwrap();
        f.inventory.add(ItemStack::new("rice", 30, 75)).unwrap();
        f.inventory.add(ItemStack::new("steel", 12, 75)).unwrap();
    }
    for _ in 0..10 {
        sim.tick();
    }

    let mut buffer = Vec::new();
    let saved = sim.save(&mut buffer).is_ok();
    results.push(TestResult {
        name: "persistence_save".into(),
        passed: saved && !buffer.is_empty(),
        detail: format!("{} bytes written", buffer.len()),
    });

    let restored = match Simulation::load(buffer.as_slice()) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult {
                name: "persistence_load".into(),
                passed: false,
                detail: format!("load failed: {}", e),
            });
            return results;
        }
    };

    let facility_ok = restored
        .world()
        .query::<&Facility>()
        .iter()
        .next()
        .map(|(_, f)| {
            f.occupant_id == Some(occupant)
                && f.suspension_applied
                && f.inventory.len() == 2
                && f.inventory.stacks()[0].kind == "rice"
                && f.inventory.stacks()[1].kind == "steel"
        })
        .unwrap_or(false);
    results.push(TestResult {
        name: "persistence_round_trip".into(),
        passed: facility_ok && restored.current_tick() == sim.current_tick(),
        detail: format!(
            "tick {} restored, occupant and stack order intact",
            restored.current_tick()
        ),
    });

    let occupant_withdrawn = restored
        .world()
        .query::<(&ActorId, &Conditions)>()
        .iter()
        .any(|(e, (id, c))| {
            id.0 == occupant
                && c.has(ConditionKind::Suspension)
                && restored.world().get::<&Position>(e).is_err()
        });
    results.push(TestResult {
        name: "persistence_occupant_state".into(),
        passed: occupant_withdrawn,
        detail: "occupant still withdrawn and suspended after load".into(),
    });

    results
}
