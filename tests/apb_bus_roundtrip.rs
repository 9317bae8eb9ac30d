// SPDX-License-Identifier: Apache-2.0

use socweave::bus::WidthSpec;
use socweave::{BusCatalog, Selector};

/// §8 scenario 1: import a semicolon-delimited APB CSV, reload the
/// library from disk, and check direction/width for two signals.
#[test]
fn apb_csv_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("apb.csv");
    std::fs::write(
        &csv_path,
        "Name;Mode;Direction;Width;Qualifier;Description\n\
         pclk;system;in;1;control;APB clock\n\
         paddr;master;out;32;address;APB address\n\
         pwdata;master;out;32;data;APB write data\n\
         pwrite;master;out;1;control;APB write enable\n\
         psel;master;out;1;select;APB select\n\
         penable;master;out;1;control;APB enable\n\
         prdata;slave;out;32;data;APB read data\n\
         pready;slave;out;1;control;APB ready\n\
         pslverr;slave;out;1;status;APB slave error\n\
         preset_n;system;in;1;control;APB reset\n",
    )
    .unwrap();

    let mut catalog = BusCatalog::new(dir.path());
    catalog.import_from_csv(Some("apb_lib"), Some("apb"), &csv_path).unwrap();
    catalog.save(&Selector::Exact("apb_lib".to_string())).unwrap();

    let mut reloaded = BusCatalog::new(dir.path());
    reloaded.load(&Selector::pattern("apb_lib").unwrap()).unwrap();

    assert!(reloaded.is_bus_exist("apb"));

    let def = reloaded.get_bus("apb").unwrap();
    let pclk = def.0.get("pclk").unwrap();
    assert_eq!(pclk.direction.as_deref(), Some("in"));
    assert_eq!(pclk.width, Some(WidthSpec::Bits(1)));

    let prdata = def.0.get("prdata").unwrap();
    assert_eq!(prdata.direction.as_deref(), Some("out"));
    assert_eq!(prdata.width, Some(WidthSpec::Bits(32)));
}
