// ==========================================
// BOM 导入集成测试
// ==========================================
// 测试范围: CSV 解析 → 零件匹配 → 行校验 → 单事务写入
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use helpers::test_data_builder::PartBuilder;
use mrp_orders::domain::Part;
use mrp_orders::importer::ImportError;

fn assembly_with_parts(env: &ApiTestEnv) -> (Part, Part, Part) {
    let assembly = env.part(PartBuilder::new("Widget").assembly());
    let resistor = env.part(PartBuilder::new("Resistor").ipn("R-100"));
    let screw = env.part(PartBuilder::new("M3 Screw"));
    (assembly, resistor, screw)
}

#[test]
fn test_import_bom_from_csv() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (assembly, resistor, screw) = assembly_with_parts(&env);

    let file = write_temp_csv(
        "Part,Quantity,Reference,Optional,Consumable\n\
         R-100,4,R1-R4,,\n\
         M3 Screw,2,,no,yes\n",
    )
    .unwrap();

    let summary = env
        .bom_importer
        .import(assembly.id, file.path(), USER)
        .unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.assembly_id, assembly.id);

    let bom = env.catalog_api.get_bom(assembly.id).unwrap();
    assert_eq!(bom.len(), 2);
    let r = bom.iter().find(|b| b.sub_part_id == resistor.id).unwrap();
    assert_eq!(r.quantity, 4.0);
    assert_eq!(r.reference, "R1-R4");
    assert!(!r.consumable);
    let s = bom.iter().find(|b| b.sub_part_id == screw.id).unwrap();
    assert!(s.consumable);
    assert!(!s.optional);

    let logs = env.action_logs("part", assembly.id);
    assert!(logs.iter().any(|l| l.action_type == "ImportBom"));
}

#[test]
fn test_import_is_all_or_nothing() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (assembly, _, _) = assembly_with_parts(&env);

    let file = write_temp_csv(
        "part,quantity\n\
         Resistor,4\n\
         Unknown Part,1\n",
    )
    .unwrap();

    let err = env
        .bom_importer
        .import(assembly.id, file.path(), USER)
        .unwrap_err();
    assert!(matches!(err, ImportError::RowError { row: 3, ref field, .. } if field == "part"));
    assert!(env.catalog_api.get_bom(assembly.id).unwrap().is_empty());
}

#[test]
fn test_import_row_validation() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (assembly, _, _) = assembly_with_parts(&env);

    let bad_quantity = write_temp_csv("part,quantity\nResistor,abc\n").unwrap();
    let err = env
        .bom_importer
        .import(assembly.id, bad_quantity.path(), USER)
        .unwrap_err();
    assert!(matches!(err, ImportError::RowError { row: 2, ref field, .. } if field == "quantity"));

    let zero = write_temp_csv("part,quantity\nResistor,0\n").unwrap();
    let err = env
        .bom_importer
        .import(assembly.id, zero.path(), USER)
        .unwrap_err();
    assert!(matches!(err, ImportError::RowError { ref field, .. } if field == "quantity"));

    let self_reference = write_temp_csv("part,quantity\nWidget,1\n").unwrap();
    let err = env
        .bom_importer
        .import(assembly.id, self_reference.path(), USER)
        .unwrap_err();
    assert!(matches!(err, ImportError::RowError { ref field, .. } if field == "sub_part"));
}

#[test]
fn test_import_file_level_errors() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (assembly, _, _) = assembly_with_parts(&env);

    let missing = write_temp_csv("part,reference\nResistor,R1\n").unwrap();
    assert!(matches!(
        env.bom_importer.import(assembly.id, missing.path(), USER),
        Err(ImportError::MissingColumn(ref c)) if c == "quantity"
    ));

    let empty = write_temp_csv("part,quantity\n").unwrap();
    assert!(matches!(
        env.bom_importer.import(assembly.id, empty.path(), USER),
        Err(ImportError::EmptyFile)
    ));

    assert!(matches!(
        env.bom_importer
            .import(assembly.id, "/nonexistent/bom.csv", USER),
        Err(ImportError::FileNotFound(_))
    ));
}

#[test]
fn test_import_into_non_assembly_fails() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (_, resistor, _) = assembly_with_parts(&env);

    let file = write_temp_csv("part,quantity\nM3 Screw,1\n").unwrap();
    let err = env
        .bom_importer
        .import(resistor.id, file.path(), USER)
        .unwrap_err();
    assert!(matches!(err, ImportError::RowError { row: 2, ref field, .. } if field == "part"));
}
