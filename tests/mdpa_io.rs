use mesh_refine::io::vtk::write_scope_files;
use mesh_refine::prelude::*;
use std::fs;
use std::process::Command;

const CAVITY: &str = "\
Begin ModelPartData
End ModelPartData

Begin Properties 1
End Properties

Begin Nodes
    1  0.0000000000e+00  0.0000000000e+00  0.0000000000e+00
    2  2.0000000000e+00  0.0000000000e+00  0.0000000000e+00
    3  2.0000000000e+00  2.0000000000e+00  0.0000000000e+00
    4  0.0000000000e+00  2.0000000000e+00  0.0000000000e+00
End Nodes

Begin Elements Element2D3N // fluid
    1  1  1  2  3
    2  1  1  3  4
End Elements

Begin Conditions WallCondition2D2N
    1  1  1  2
    2  1  4  1
End Conditions

Begin SubModelPart Walls
    Begin SubModelPartNodes
        1
        2
        4
    End SubModelPartNodes
    Begin SubModelPartElements
    End SubModelPartElements
    Begin SubModelPartConditions
        1
        2
    End SubModelPartConditions
End SubModelPart
";

#[test]
fn refined_mesh_round_trips_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cavity.MDPA");
    let output = dir.path().join("cavity_fine.mdpa");
    fs::write(&input, CAVITY).unwrap();

    let coarse = read_mesh(&input).unwrap();
    assert_eq!(coarse.name(), "cavity");
    let refined = refine_hierarchy(&coarse, &RefineOptions::default()).unwrap();
    write_mesh(&refined.mesh, &output).unwrap();
    assert!(!dir.path().join("cavity_fine.mdpa.tmp").exists());

    let back = read_mesh(&output).unwrap();
    assert_eq!(back.node_count(), 4 + 5);
    assert_eq!(back.element_count(), 8);
    assert_eq!(back.condition_count(), 4);
    let walls = back.child(ScopeId::ROOT, "Walls").unwrap();
    assert_eq!(back.count::<Condition>(walls), 4);
    // nodes 1, 2, 4 plus midpoints of (1,2) and (1,4); (2,4) is not an edge
    assert_eq!(back.count::<Node>(walls), 5);
    assert_eq!(
        back.nodes().collect::<Vec<_>>(),
        refined.mesh.nodes().collect::<Vec<_>>()
    );
}

#[test]
fn unbuilt_backend_is_rejected_before_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mesh = MeshHierarchy::new("empty");
    let err = write_mesh(&mesh, dir.path().join("out.med")).unwrap_err();
    assert!(matches!(err, MeshRefineError::UnsupportedFileFormat(_)));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn scale_mesh_multiplies_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cavity.mdpa");
    let output = dir.path().join("cavity_mm.mdpa");
    fs::write(&input, CAVITY).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_scale_mesh"))
        .args([input.as_os_str(), output.as_os_str()])
        .arg("1000")
        .status()
        .unwrap();
    assert!(status.success());

    let scaled = read_mesh(&output).unwrap();
    assert_eq!(
        scaled.node(EntityId::new(3).unwrap()).unwrap().coords,
        [2000.0, 2000.0, 0.0]
    );
    assert_eq!(scaled.summary().replace("cavity_mm", "cavity"), {
        let original = read_mesh(&input).unwrap();
        original.summary()
    });
}

#[test]
fn scale_mesh_accepts_model_names() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("cavity.mdpa"), CAVITY).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_scale_mesh"))
        .arg(dir.path().join("cavity"))
        .arg(dir.path().join("cavity_half"))
        .arg("0.5")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let scaled = read_mesh(dir.path().join("cavity_half.mdpa")).unwrap();
    assert_eq!(scaled.name(), "cavity_half");
    assert_eq!(
        scaled.node(EntityId::new(3).unwrap()).unwrap().coords,
        [1.0, 1.0, 0.0]
    );
    assert!(!dir.path().join("cavity_half").exists());
}

#[test]
fn every_scope_gets_a_vtk_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cavity.mdpa");
    fs::write(&input, CAVITY).unwrap();
    let mesh = read_mesh(&input).unwrap();

    let paths = write_scope_files(&mesh, dir.path()).unwrap();
    assert_eq!(paths.len(), 2);
    let walls = fs::read_to_string(dir.path().join("cavity").join("cavity.Walls.vtk")).unwrap();
    assert!(walls.contains("SCALARS condition_ids long 1"));
    assert!(walls.contains("CELL_TYPES 2\n3\n3\n"));

    let out_dir = dir.path().join("vis");
    let status = Command::new(env!("CARGO_BIN_EXE_visualize_mesh"))
        .arg(&input)
        .arg("--out-dir")
        .arg(&out_dir)
        .status()
        .unwrap();
    assert!(status.success());
    assert!(out_dir.join("cavity").join("cavity.vtk").exists());

    let by_name = dir.path().join("by_name");
    let status = Command::new(env!("CARGO_BIN_EXE_visualize_mesh"))
        .arg(dir.path().join("cavity"))
        .arg("--out-dir")
        .arg(&by_name)
        .status()
        .unwrap();
    assert!(status.success());
    assert!(by_name.join("cavity").join("cavity.Walls.vtk").exists());
}
