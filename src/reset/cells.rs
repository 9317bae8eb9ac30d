// SPDX-License-Identifier: Apache-2.0

//! `reset_cell.v` template emission (§4.F "Reset-cell templates"): three
//! parameterizable, synthesizable reset cells shared by every generated
//! reset controller. Written once per output directory; left untouched on
//! subsequent runs unless `force` is set.

use std::path::Path;

use crate::error::{Diagnostic, Result};

const RESET_CELL_TEMPLATE: &str = r#"/**
 * @file reset_cell.v
 * @brief Template reset cells for reset primitives
 *
 * @details Auto-generated template file.
 * CAUTION: replace the templates in this file with your technology's
 *          standard-cell implementations before using in production.
 */

`timescale 1ns / 1ps

/**
 * @brief Asynchronous reset synchronizer (active-low)
 * @param STAGE Number of sync stages (>=2 recommended)
 */
module qsoc_rst_sync
#(
    parameter integer STAGE = 3
)
(
    input  wire clk,        /**< Clock input */
    input  wire rst_in_n,   /**< Reset input (active-low) */
    input  wire test_enable, /**< Test enable signal */
    output wire rst_out_n   /**< Reset output (active-low) */
);

    localparam integer S = (STAGE < 1) ? 1 : STAGE;

    reg  [S-1:0] sync_reg;
    wire         core_rst_n;

    generate
        if (S == 1) begin : g_st1
            always @(posedge clk or negedge rst_in_n) begin
                if (!rst_in_n) sync_reg <= 1'b0;
                else           sync_reg <= 1'b1;
            end
        end else begin : g_stN
            always @(posedge clk or negedge rst_in_n) begin
                if (!rst_in_n) sync_reg <= {S{1'b0}};
                else           sync_reg <= {sync_reg[S-2:0], 1'b1};
            end
        end
    endgenerate

    assign core_rst_n = sync_reg[S-1];
    assign rst_out_n  = test_enable ? rst_in_n : core_rst_n;

endmodule

/**
 * @brief Synchronous reset pipeline (active-low)
 * @param STAGE Number of pipeline stages (>=1)
 */
module qsoc_rst_pipe
#(
    parameter integer STAGE = 4
)
(
    input  wire clk,        /**< Clock input */
    input  wire rst_in_n,   /**< Reset input (active-low) */
    input  wire test_enable, /**< Test enable signal */
    output wire rst_out_n   /**< Reset output (active-low) */
);

    localparam integer S = (STAGE < 1) ? 1 : STAGE;

    reg  [S-1:0] pipe_reg;
    wire         core_rst_n;

    generate
        if (S == 1) begin : g_st1
            always @(posedge clk) begin
                if (!rst_in_n) pipe_reg <= 1'b0;
                else           pipe_reg <= 1'b1;
            end
        end else begin : g_stN
            always @(posedge clk) begin
                if (!rst_in_n) pipe_reg <= {S{1'b0}};
                else           pipe_reg <= {pipe_reg[S-2:0], 1'b1};
            end
        end
    endgenerate

    assign core_rst_n = pipe_reg[S-1];
    assign rst_out_n  = test_enable ? rst_in_n : core_rst_n;

endmodule

/**
 * @brief Counter-based reset release (active-low)
 * @param CYCLE Number of cycles before release
 */
module qsoc_rst_count
#(
    parameter integer CYCLE = 16
)
(
    input  wire clk,        /**< Clock input */
    input  wire rst_in_n,   /**< Reset input (active-low) */
    input  wire test_enable, /**< Test enable signal */
    output wire rst_out_n   /**< Reset output (active-low) */
);

    /* ceil(log2(n)) for n>=1 */
    function integer clog2;
        input integer n;
        integer v;
        begin
            v = (n < 1) ? 1 : n - 1;
            clog2 = 0;
            while (v > 0) begin
                v = v >> 1;
                clog2 = clog2 + 1;
            end
            if (clog2 == 0) clog2 = 1;
        end
    endfunction

    localparam integer C_INT     = (CYCLE < 1) ? 1 : CYCLE;
    localparam integer CNT_WIDTH = clog2(C_INT);
    localparam [CNT_WIDTH-1:0] C_M1 = C_INT - 1;

    reg [CNT_WIDTH-1:0] cnt;
    reg                 core_rst_n;

    always @(posedge clk or negedge rst_in_n) begin
        if (!rst_in_n) begin
            cnt        <= {CNT_WIDTH{1'b0}};
            core_rst_n <= 1'b0;
        end else if (!core_rst_n) begin
            if (cnt == C_M1) begin
                core_rst_n <= 1'b1;
            end else begin
                cnt <= cnt + {{(CNT_WIDTH-1){1'b0}}, 1'b1};
            end
        end
    end

    assign rst_out_n = test_enable ? rst_in_n : core_rst_n;

endmodule
"#;

/// Writes `<output_dir>/reset_cell.v` unless it already exists, in which
/// case the call is a no-op, unless `force` requests a refresh.
pub fn write_reset_cell_file(output_dir: &Path, force: bool) -> Result<()> {
    let path = output_dir.join("reset_cell.v");
    if path.exists() && !force {
        return Ok(());
    }
    std::fs::write(&path, RESET_CELL_TEMPLATE).map_err(|e| {
        log::warn!("Cannot open reset_cell.v for writing: {e}");
        Diagnostic::Other(format!("cannot write {}: {e}", path.display()))
    })
}
